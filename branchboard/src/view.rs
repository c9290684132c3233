//! The output side of the pipeline: what a recomputed view publishes to the
//! presentation layer.
//!
//! The core emits raw typed values plus two sentinel states; all visual
//! formatting (currency symbols, percent signs, decimal places) belongs to
//! whatever consumes these types.

use serde::Serialize;

use crate::{ClockTime, Month};

/// Result of a scalar lookup against the current selection.
///
/// The two sentinels are deliberately distinct: [`Scalar::NoData`] means no
/// row in the relevant table matched the selected branch at all, while
/// [`Scalar::NotAvailable`] means a row matched but the field itself was
/// null or unparseable in the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Value(f64),
    NotAvailable,
    NoData,
}

/// Semantic type of a value, for consumers that format or chart it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Count,
    Percent,
    Currency,
    Minutes,
}

/// An ordered label→value series for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub unit: Unit,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

impl Series {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            points: Vec::new(),
        }
    }

    pub fn push<L: Into<String>>(&mut self, label: L, value: f64) {
        self.points.push(SeriesPoint {
            label: label.into(),
            value,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Semantic type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Rank,
    Label,
    Count,
    Percent,
    Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A single table cell; rows hold cells in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(u64),
    Float(f64),
    Text(String),
}

/// A small, display-ready table with a fixed column schema and a
/// deterministic row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// One point in the program start-time vs. attendance scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub start_time: ClockTime,
    pub attendance: f64,
    pub title: Option<String>,
}

/// One row of the long-format physical-item reshape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: Month,
    pub category: &'static str,
    pub count: u64,
}

/// What a view publishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewOutput {
    Scalar(Scalar),
    Series(Series),
    Table(Table),
    Points(Vec<ScatterPoint>),
    Trend(Vec<TrendPoint>),
}

/// The closed set of views the dashboard can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    MedianIncome,
    UninsuredRate,
    UnemploymentRate,
    FoodInsecurityRate,
    AgeDistribution,
    RaceDistribution,
    MonthlyVisits,
    AttendanceByAudience,
    ProgramScatter,
    TotalStations,
    TotalSessions,
    AvgSessionLength,
    TopGenres,
    TopReadingLevels,
    TopBooks,
    TopDvds,
    PhysicalReadingTrend,
}

impl ViewId {
    /// Every registered view, in publication order.
    pub const ALL: [ViewId; 17] = [
        ViewId::MedianIncome,
        ViewId::UninsuredRate,
        ViewId::UnemploymentRate,
        ViewId::FoodInsecurityRate,
        ViewId::AgeDistribution,
        ViewId::RaceDistribution,
        ViewId::MonthlyVisits,
        ViewId::AttendanceByAudience,
        ViewId::ProgramScatter,
        ViewId::TotalStations,
        ViewId::TotalSessions,
        ViewId::AvgSessionLength,
        ViewId::TopGenres,
        ViewId::TopReadingLevels,
        ViewId::TopBooks,
        ViewId::TopDvds,
        ViewId::PhysicalReadingTrend,
    ];

    /// Stable name under which the view is published.
    pub fn name(&self) -> &'static str {
        match self {
            ViewId::MedianIncome => "median_income",
            ViewId::UninsuredRate => "uninsured_rate",
            ViewId::UnemploymentRate => "unemployment_rate",
            ViewId::FoodInsecurityRate => "food_insecurity_rate",
            ViewId::AgeDistribution => "age_distribution",
            ViewId::RaceDistribution => "race_distribution",
            ViewId::MonthlyVisits => "monthly_visits",
            ViewId::AttendanceByAudience => "attendance_by_audience",
            ViewId::ProgramScatter => "program_scatter",
            ViewId::TotalStations => "total_stations",
            ViewId::TotalSessions => "total_sessions",
            ViewId::AvgSessionLength => "avg_session_length",
            ViewId::TopGenres => "top_genres",
            ViewId::TopReadingLevels => "top_reading_levels",
            ViewId::TopBooks => "top_books",
            ViewId::TopDvds => "top_dvds",
            ViewId::PhysicalReadingTrend => "physical_reading_trend",
        }
    }

    /// Look a view up by its published name.
    pub fn from_name(name: &str) -> Option<ViewId> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
