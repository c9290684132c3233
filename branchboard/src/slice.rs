//! The filter stage: per-table row slices for one selected branch.
//!
//! A slice is a list of row indices into its source table rather than a copy
//! of the rows, so one slice can feed any number of aggregations without
//! cloning. Slices are computed once per selection epoch by the dashboard
//! and discarded on the next selection change.

use crate::SourceTables;

/// Row indices matching one branch, for every table keyed by branch name.
///
/// An unknown branch yields empty slices across the board; that is the
/// "no data found" case, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSlices {
    pub visits: Vec<usize>,
    pub programs: Vec<usize>,
    pub census: Vec<usize>,
    pub computer: Vec<usize>,
    pub titles: Vec<usize>,
    pub physical: Vec<usize>,
}

impl BranchSlices {
    /// Slice every table down to the rows whose branch column equals the
    /// given branch name.
    pub fn compute(tables: &SourceTables, branch: &str) -> Self {
        Self {
            visits: matching_rows(&tables.visits, branch, |r| &r.branch_name),
            programs: matching_rows(&tables.programs, branch, |r| &r.branch_name),
            census: matching_rows(&tables.census, branch, |r| &r.branch_name),
            computer: matching_rows(&tables.computer, branch, |r| &r.branch_name),
            titles: matching_rows(&tables.titles, branch, |r| &r.branch_name),
            physical: matching_rows(&tables.physical, branch, |r| &r.branch_name),
        }
    }
}

fn matching_rows<T>(rows: &[T], branch: &str, key: impl Fn(&T) -> &str) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| key(row) == branch)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tables::{BranchRecord, VisitRecord};
    use crate::Month;

    fn visit(branch: &str, month: Month) -> VisitRecord {
        VisitRecord {
            branch_name: branch.to_string(),
            month: Some(month),
            value: Some(1.0),
        }
    }

    #[test]
    fn slices_pick_only_matching_rows() {
        let month = Month::new(2023, 1).unwrap();
        let tables = SourceTables {
            branches: vec![BranchRecord {
                name: "Main".into(),
            }],
            visits: vec![visit("Main", month), visit("South", month), visit("Main", month)],
            ..Default::default()
        };
        let slices = BranchSlices::compute(&tables, "Main");
        assert_eq!(slices.visits, vec![0, 2]);
        assert!(slices.programs.is_empty());
    }

    #[test]
    fn unknown_branch_yields_empty_slices() {
        let tables = SourceTables::default();
        let slices = BranchSlices::compute(&tables, "Nonexistent Branch");
        assert_eq!(slices, BranchSlices::default());
    }
}
