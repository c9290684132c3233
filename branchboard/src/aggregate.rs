//! The aggregation stage: every named derivation from a branch slice to a
//! display-ready value.
//!
//! Each function here is a pure derivation over the current
//! [`BranchSlices`]: no interior state, no side effects, and identical
//! inputs always produce identical output, including tie-break order. The
//! dashboard decides when these run; this module only knows how.

use std::collections::BTreeMap;

use crate::tables::PhysicalReadingRecord;
use crate::view::{
    Cell, Column, ColumnKind, Scalar, ScatterPoint, Series, Table, TrendPoint, Unit,
};
use crate::{BranchSlices, Month, SourceTables};

/// Canonical display order for program audience categories. Categories
/// absent from the data are omitted, never synthesized; categories outside
/// this list trail it in name order.
pub const AUDIENCE_ORDER: [&str; 6] = [
    "Children Ages 0-5",
    "Children Ages 6-11",
    "Teens Ages 12-18",
    "Adults Ages 19+",
    "Seniors",
    "All Ages",
];

const AGE_BUCKETS: [&str; 5] = ["<10", "10\u{2013}19", "20\u{2013}39", "40\u{2013}59", "60+"];
const RACE_LABELS: [&str; 4] = ["Black", "White", "Asian", "Latino"];

/// Reading-age category codes mapped to display labels, in publication
/// order.
const READING_CATEGORIES: [(&str, fn(&PhysicalReadingRecord) -> Option<u64>); 3] = [
    ("Adult", |r| r.adult),
    ("Young Adult", |r| r.young_adult),
    ("Juvenile", |r| r.juvenile),
];

// ---------------------------------------------------------------------------
// Scalar lookups
// ---------------------------------------------------------------------------

/// First-matching-row scalar lookup with the two-sentinel contract: an empty
/// slice is "no data found", a matching row with a null field is "data not
/// available".
fn scalar_field<T>(rows: &[T], slice: &[usize], field: impl Fn(&T) -> Option<f64>) -> Scalar {
    match slice.first() {
        None => Scalar::NoData,
        Some(&i) => field(&rows[i]).map_or(Scalar::NotAvailable, Scalar::Value),
    }
}

pub fn median_income(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.census, &slices.census, |r| r.median_income)
}

pub fn uninsured_rate(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.census, &slices.census, |r| r.uninsured)
}

pub fn unemployment_rate(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.census, &slices.census, |r| r.unemployment)
}

pub fn food_insecurity_rate(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.census, &slices.census, |r| r.food_insecurity)
}

pub fn total_stations(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.computer, &slices.computer, |r| r.total_stations)
}

pub fn total_sessions(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.computer, &slices.computer, |r| r.total_sessions)
}

pub fn average_session_length(tables: &SourceTables, slices: &BranchSlices) -> Scalar {
    scalar_field(&tables.computer, &slices.computer, |r| {
        r.average_session_length
    })
}

// ---------------------------------------------------------------------------
// Distributions and series
// ---------------------------------------------------------------------------

/// Fixed-order age-bucket counts from the first matching census row. Null
/// buckets are skipped; an empty slice yields an empty series.
pub fn age_distribution(tables: &SourceTables, slices: &BranchSlices) -> Series {
    let mut series = Series::new(Unit::Count);
    if let Some(&i) = slices.census.first() {
        let row = &tables.census[i];
        let buckets = [
            row.age_under_10,
            row.age_10_to_20,
            row.age_20_to_40,
            row.age_40_to_60,
            row.age_60_plus,
        ];
        for (label, value) in AGE_BUCKETS.iter().zip(buckets) {
            if let Some(value) = value {
                series.push(*label, value);
            }
        }
    }
    series
}

/// Race/ethnicity proportions scaled to percentage units here, not by the
/// presentation layer.
pub fn race_distribution(tables: &SourceTables, slices: &BranchSlices) -> Series {
    let mut series = Series::new(Unit::Percent);
    if let Some(&i) = slices.census.first() {
        let row = &tables.census[i];
        let proportions = [row.black, row.white, row.asian, row.latino];
        for (label, value) in RACE_LABELS.iter().zip(proportions) {
            if let Some(value) = value {
                series.push(*label, value * 100.0);
            }
        }
    }
    series
}

/// Monthly visit counts sorted ascending by month. No aggregation beyond
/// the sort; rows with a null month or count contribute no point.
pub fn monthly_visits(tables: &SourceTables, slices: &BranchSlices) -> Series {
    let mut rows: Vec<(Month, f64)> = slices
        .visits
        .iter()
        .map(|&i| &tables.visits[i])
        .filter_map(|r| match (r.month, r.value) {
            (Some(month), Some(value)) => Some((month, value)),
            _ => None,
        })
        .collect();
    rows.sort_by_key(|(month, _)| *month);
    let mut series = Series::new(Unit::Count);
    for (month, value) in rows {
        series.push(month.to_string(), value);
    }
    series
}

// ---------------------------------------------------------------------------
// Program analytics
// ---------------------------------------------------------------------------

/// Mean attendance and program count per audience category, in the
/// canonical audience order. Events without a recorded attendance count
/// toward neither measure.
pub fn attendance_by_audience(tables: &SourceTables, slices: &BranchSlices) -> Table {
    let mut groups: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
    for &i in &slices.programs {
        let row = &tables.programs[i];
        if let Some(attendance) = row.actual_attendance {
            let entry = groups.entry(row.audience.as_str()).or_insert((0.0, 0));
            entry.0 += attendance;
            entry.1 += 1;
        }
    }

    let mut table = Table::new(vec![
        Column::new("Audience", ColumnKind::Label),
        Column::new("Average attendance", ColumnKind::Count),
        Column::new("Programs", ColumnKind::Count),
    ]);
    let mut push_row = |audience: &str, sum: f64, count: u64| {
        table.rows.push(vec![
            Cell::Text(audience.to_string()),
            Cell::Float(sum / count as f64),
            Cell::Int(count),
        ]);
    };
    for audience in AUDIENCE_ORDER {
        if let Some((sum, count)) = groups.remove(audience) {
            push_row(audience, sum, count);
        }
    }
    // Anything not in the canonical list trails it, name-ordered.
    for (audience, (sum, count)) in groups {
        push_row(audience, sum, count);
    }
    table
}

/// Start time vs. attendance points for the program scatter. The attendance
/// cap is applied here, at the aggregation stage; rows without a parseable
/// start time or attendance emit no point.
pub fn program_scatter(
    tables: &SourceTables,
    slices: &BranchSlices,
    attendance_cap: f64,
) -> Vec<ScatterPoint> {
    let mut points = Vec::new();
    for &i in &slices.programs {
        let row = &tables.programs[i];
        if let (Some(start_time), Some(attendance)) = (row.start_time, row.actual_attendance) {
            if attendance < attendance_cap {
                points.push(ScatterPoint {
                    start_time,
                    attendance,
                    title: row.title.clone(),
                });
            }
        }
    }
    points
}

// ---------------------------------------------------------------------------
// Top-N rankings
// ---------------------------------------------------------------------------

/// Sort grouped sums descending by count (ties broken by key ascending,
/// which the stable sort preserves from the map's key order) and truncate.
fn sorted_sums<K: Ord>(groups: BTreeMap<K, u64>, limit: usize) -> Vec<(K, u64)> {
    let mut rows: Vec<(K, u64)> = groups.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.truncate(limit);
    rows
}

/// Dense ranks over an already sorted-and-truncated ranking: ties share a
/// rank and the next distinct count gets exactly rank + 1. Ranking after
/// truncation is deliberate; a count tied with the final row but sorted
/// outside the cut stays dropped.
fn dense_rank<K>(rows: Vec<(K, u64)>) -> Vec<(K, u64, u64)> {
    let mut ranked = Vec::with_capacity(rows.len());
    let mut rank = 0u64;
    let mut previous: Option<u64> = None;
    for (key, count) in rows {
        if previous != Some(count) {
            rank += 1;
            previous = Some(count);
        }
        ranked.push((key, count, rank));
    }
    ranked
}

/// Top genres by summed checkouts: Rank / Genre / Checkouts.
pub fn top_genres(tables: &SourceTables, slices: &BranchSlices, limit: usize) -> Table {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for &i in &slices.titles {
        let row = &tables.titles[i];
        *groups.entry(row.genre.as_str()).or_default() += row.checkouts.unwrap_or(0);
    }
    let mut table = Table::new(vec![
        Column::new("Rank", ColumnKind::Rank),
        Column::new("Genre", ColumnKind::Label),
        Column::new("Checkouts", ColumnKind::Count),
    ]);
    for (genre, checkouts, rank) in dense_rank(sorted_sums(groups, limit)) {
        table.rows.push(vec![
            Cell::Int(rank),
            Cell::Text(genre.to_string()),
            Cell::Int(checkouts),
        ]);
    }
    table
}

/// Checkouts summed by reading level, truncated but unranked:
/// Reading level / Checkouts.
pub fn top_reading_levels(tables: &SourceTables, slices: &BranchSlices, limit: usize) -> Table {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for &i in &slices.titles {
        let row = &tables.titles[i];
        *groups.entry(row.reading_level.as_str()).or_default() += row.checkouts.unwrap_or(0);
    }
    let mut table = Table::new(vec![
        Column::new("Reading level", ColumnKind::Label),
        Column::new("Checkouts", ColumnKind::Count),
    ]);
    for (reading_level, checkouts) in sorted_sums(groups, limit) {
        table.rows.push(vec![
            Cell::Text(reading_level.to_string()),
            Cell::Int(checkouts),
        ]);
    }
    table
}

/// Checkouts grouped by (material type, title). This intermediate is shared
/// by the book and DVD rankings, so the dashboard computes it once per
/// selection epoch.
pub fn checkouts_by_material_and_title(
    tables: &SourceTables,
    slices: &BranchSlices,
) -> BTreeMap<(String, String), u64> {
    let mut groups: BTreeMap<(String, String), u64> = BTreeMap::new();
    for &i in &slices.titles {
        let row = &tables.titles[i];
        *groups
            .entry((row.material_type.clone(), row.title.clone()))
            .or_default() += row.checkouts.unwrap_or(0);
    }
    groups
}

/// Top titles restricted to the given material types:
/// Rank / Title / Category / Checkouts. Material filtering happens before
/// ranking, on the shared grouped intermediate.
fn material_ranking(
    groups: &BTreeMap<(String, String), u64>,
    materials: &[&str],
    limit: usize,
) -> Table {
    let mut filtered: BTreeMap<(String, String), u64> = BTreeMap::new();
    for ((material, title), &checkouts) in groups {
        if materials.contains(&material.as_str()) {
            // Keyed (title, material) so ties break on the title.
            filtered.insert((title.clone(), material.clone()), checkouts);
        }
    }
    let mut table = Table::new(vec![
        Column::new("Rank", ColumnKind::Rank),
        Column::new("Title", ColumnKind::Label),
        Column::new("Category", ColumnKind::Label),
        Column::new("Checkouts", ColumnKind::Count),
    ]);
    for ((title, material), checkouts, rank) in dense_rank(sorted_sums(filtered, limit)) {
        table.rows.push(vec![
            Cell::Int(rank),
            Cell::Text(title),
            Cell::Text(material),
            Cell::Int(checkouts),
        ]);
    }
    table
}

pub fn top_books(groups: &BTreeMap<(String, String), u64>, limit: usize) -> Table {
    material_ranking(groups, &["BOOKS"], limit)
}

pub fn top_dvds(groups: &BTreeMap<(String, String), u64>, limit: usize) -> Table {
    material_ranking(groups, &["DVDS", "DVD-BLURAY"], limit)
}

// ---------------------------------------------------------------------------
// Long-format reshape
// ---------------------------------------------------------------------------

/// Pivot the wide per-category monthly counts into long (month, category,
/// count) rows. Rows with a null month and cells with a null count are
/// dropped; categories appear in fixed label order with months ascending
/// within each.
pub fn physical_reading_trend(tables: &SourceTables, slices: &BranchSlices) -> Vec<TrendPoint> {
    let mut ordered: Vec<(Month, &PhysicalReadingRecord)> = slices
        .physical
        .iter()
        .map(|&i| &tables.physical[i])
        .filter_map(|r| r.month.map(|month| (month, r)))
        .collect();
    ordered.sort_by_key(|(month, _)| *month);

    let mut points = Vec::new();
    for (category, count_of) in READING_CATEGORIES {
        for (month, row) in &ordered {
            if let Some(count) = count_of(row) {
                points.push(TrendPoint {
                    month: *month,
                    category,
                    count,
                });
            }
        }
    }
    points
}
