//! The seven source tables and their loading.
//!
//! Tables are loaded once at startup and never mutated afterwards; every
//! derivation downstream is a pure function of (tables, selection). Numeric
//! fields deserialize leniently: an unparseable value becomes `None` at load
//! time and surfaces later as the "data not available" sentinel, never as a
//! load failure.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use eyre::{Result, WrapErr};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::{ClockTime, Error, Month};

/// One row of the branch metadata table. The name column doubles as the
/// selection key for every other table.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchRecord {
    #[serde(rename = "branch_name")]
    pub name: String,
}

/// One month of gate-count visits for one branch.
#[derive(Debug, Clone, Deserialize)]
pub struct VisitRecord {
    pub branch_name: String,
    #[serde(rename = "month_date", deserialize_with = "lenient_month")]
    pub month: Option<Month>,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
}

/// One public-calendar program event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramRecord {
    pub branch_name: String,
    #[serde(rename = "audiences")]
    pub audience: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub actual_attendance: Option<f64>,
    #[serde(rename = "time_parsed", deserialize_with = "lenient_time", default)]
    pub start_time: Option<ClockTime>,
}

/// Census, economic, and food-insecurity indicators for one branch's service
/// area. All rate columns are proportions in [0, 1].
#[derive(Debug, Clone, Deserialize)]
pub struct CensusRecord {
    pub branch_name: String,
    #[serde(rename = "medianincome", deserialize_with = "lenient_f64")]
    pub median_income: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub uninsured: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub unemployment: Option<f64>,
    #[serde(rename = "overall_food_insecurity_rate", deserialize_with = "lenient_f64")]
    pub food_insecurity: Option<f64>,
    #[serde(rename = "under10", deserialize_with = "lenient_f64")]
    pub age_under_10: Option<f64>,
    #[serde(rename = "age10to20", deserialize_with = "lenient_f64")]
    pub age_10_to_20: Option<f64>,
    #[serde(rename = "age20to40", deserialize_with = "lenient_f64")]
    pub age_20_to_40: Option<f64>,
    #[serde(rename = "age40to60", deserialize_with = "lenient_f64")]
    pub age_40_to_60: Option<f64>,
    #[serde(rename = "age60plus", deserialize_with = "lenient_f64")]
    pub age_60_plus: Option<f64>,
    #[serde(rename = "black_pop", deserialize_with = "lenient_f64")]
    pub black: Option<f64>,
    #[serde(rename = "white_pop", deserialize_with = "lenient_f64")]
    pub white: Option<f64>,
    #[serde(rename = "asian_nhpi_pop", deserialize_with = "lenient_f64")]
    pub asian: Option<f64>,
    #[serde(rename = "latino_pop", deserialize_with = "lenient_f64")]
    pub latino: Option<f64>,
}

/// Public computer usage totals for one branch.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputerUseRecord {
    pub branch_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_stations: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_sessions: Option<f64>,
    #[serde(rename = "average_session_length_min", deserialize_with = "lenient_f64")]
    pub average_session_length: Option<f64>,
}

/// Title-level checkout counts with genre, material type, and reading level.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleRecord {
    pub branch_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(rename = "material_type_item_cat1", default)]
    pub material_type: String,
    #[serde(rename = "reading_level_item_cat2", default)]
    pub reading_level: String,
    #[serde(rename = "x_of_checkouts", deserialize_with = "lenient_u64")]
    pub checkouts: Option<u64>,
}

/// Monthly physical-item checkouts split by reading-age category.
#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalReadingRecord {
    pub branch_name: String,
    #[serde(deserialize_with = "lenient_month")]
    pub month: Option<Month>,
    #[serde(rename = "physical_item_adult", deserialize_with = "lenient_u64")]
    pub adult: Option<u64>,
    #[serde(rename = "physical_item_ya", deserialize_with = "lenient_u64")]
    pub young_adult: Option<u64>,
    #[serde(rename = "physical_item_juvenile", deserialize_with = "lenient_u64")]
    pub juvenile: Option<u64>,
}

/// The seven immutable source tables, loaded once for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub branches: Vec<BranchRecord>,
    pub visits: Vec<VisitRecord>,
    pub programs: Vec<ProgramRecord>,
    pub census: Vec<CensusRecord>,
    pub computer: Vec<ComputerUseRecord>,
    pub titles: Vec<TitleRecord>,
    pub physical: Vec<PhysicalReadingRecord>,
}

impl SourceTables {
    /// Load all seven tables from their CSV files in the given directory,
    /// using the dataset's original file names.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let tables = Self {
            branches: load_table(&dir.join("branch_names_crosswalk.csv"))?,
            visits: load_table(&dir.join("visits_data_all.csv"))?,
            programs: load_table(&dir.join("public_calendar.csv"))?,
            census: load_table(&dir.join("branch_service_census_food_data.csv"))?,
            computer: load_table(&dir.join("branch_computer_use.csv"))?,
            titles: load_table(&dir.join("branch_titles_filtered.csv"))?,
            physical: load_table(&dir.join("branch_physical_reading_fix.csv"))?,
        };
        debug!(
            "Loaded tables: {} branches, {} visit rows, {} program rows, {} census rows, {} computer rows, {} title rows, {} physical rows",
            tables.branches.len(),
            tables.visits.len(),
            tables.programs.len(),
            tables.census.len(),
            tables.computer.len(),
            tables.titles.len(),
            tables.physical.len(),
        );
        Ok(tables)
    }

    /// The valid selection choices: the distinct branch names of the metadata
    /// table, in first-seen order.
    pub fn branch_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for record in &self.branches {
            if !names.contains(&record.name.as_str()) {
                names.push(&record.name);
            }
        }
        names
    }
}

fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| Error::Io(path.display().to_string(), e))?;
    read_table(file).wrap_err_with(|| Error::FailedToLoadTable(path.to_path_buf()))
}

/// Parse one CSV table from any reader. Split out from [`load_table`] so
/// in-memory CSV text can use the same path.
pub fn read_table<T: DeserializeOwned, R: std::io::Read>(reader: R) -> Result<Vec<T>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Numeric coercion in the style of `errors="coerce"`: strip currency
/// symbols and thousands separators, and map anything still unparseable to
/// `None` rather than failing the load.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_number))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(parse_number)
        .filter(|v| *v >= 0.0)
        .map(|v| v as u64))
}

fn lenient_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ClockTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|s| ClockTime::from_str(s).ok()))
}

fn lenient_month<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Month>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|s| Month::from_str(s).ok()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lenient_numeric_coercion() {
        let csv = "\
branch_name,medianincome,uninsured,unemployment,overall_food_insecurity_rate,under10,age10to20,age20to40,age40to60,age60plus,black_pop,white_pop,asian_nhpi_pop,latino_pop
Main,\"$55,231.50\",0.08,not reported,0.12,120,340,900,700,410,0.4,0.35,0.1,0.15
";
        let rows: Vec<CensusRecord> = read_table(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].median_income, Some(55231.50));
        assert_eq!(rows[0].uninsured, Some(0.08));
        // Unparseable value coerces to None, not a load error.
        assert_eq!(rows[0].unemployment, None);
    }

    #[test]
    fn malformed_month_is_coerced_not_fatal() {
        let csv = "\
branch_name,month_date,value
Main,2023-01,812
Main,not-a-month,645
";
        let rows: Vec<VisitRecord> = read_table(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month.map(|m| m.to_string()), Some("2023-01".to_string()));
        assert_eq!(rows[0].value, Some(812.0));
        // Bad month coerces to None; the row and its neighbors still load.
        assert_eq!(rows[1].month, None);
        assert_eq!(rows[1].value, Some(645.0));
    }

    #[test]
    fn empty_fields_become_none() {
        let csv = "\
branch_name,audiences,title,actual_attendance,time_parsed
Main,Teens Ages 12-18,Chess Club,,14:30
Main,Seniors,,12,bad-time
";
        let rows: Vec<ProgramRecord> = read_table(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].actual_attendance, None);
        assert_eq!(
            rows[0].start_time.map(|t| t.to_string()),
            Some("14:30".to_string())
        );
        assert_eq!(rows[1].title, None);
        assert_eq!(rows[1].actual_attendance, Some(12.0));
        // Unparseable start time coerces to None.
        assert_eq!(rows[1].start_time, None);
    }

    #[test]
    fn branch_names_are_distinct_in_first_seen_order() {
        let tables = SourceTables {
            branches: vec![
                BranchRecord {
                    name: "South".into(),
                },
                BranchRecord {
                    name: "Main".into(),
                },
                BranchRecord {
                    name: "South".into(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(tables.branch_names(), vec!["South", "Main"]);
    }
}
