//! The view registry and recomputation scheduler.
//!
//! [`Dashboard`] owns the immutable source tables, the single mutable
//! selection cell, and a per-view cache. Changing the selection bumps the
//! epoch and marks every view stale; views then recompute lazily on first
//! read. Every computation is tagged with the epoch it ran for and is
//! discarded on mismatch, so a consumer can never observe a view computed
//! for anything but the current selection.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::{aggregate, BranchSlices, Config, Error, SourceTables, ViewId, ViewOutput};

/// Recomputation state of one registered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Stale,
    Computing,
    Fresh,
}

#[derive(Debug)]
struct CachedView {
    state: ViewState,
    /// Epoch the cached output was computed for.
    epoch: u64,
    output: Option<ViewOutput>,
}

/// The branch report dashboard: one selection in, seventeen views out.
#[derive(Debug)]
pub struct Dashboard {
    tables: SourceTables,
    config: Config,
    selection: Option<String>,
    /// Bumped on every selection change; fences stale computations.
    epoch: u64,
    /// Filtered slices for the current epoch, computed once and shared by
    /// every dependent aggregation.
    slices: Option<BranchSlices>,
    /// Shared (material type, title) checkout sums for the current epoch,
    /// feeding both the book and DVD rankings.
    title_groups: Option<BTreeMap<(String, String), u64>>,
    views: HashMap<ViewId, CachedView>,
}

impl Dashboard {
    /// Constructor. Tables are immutable from here on.
    pub fn new(tables: SourceTables, config: Config) -> Self {
        Self {
            tables,
            config,
            selection: None,
            epoch: 0,
            slices: None,
            title_groups: None,
            views: HashMap::new(),
        }
    }

    /// The valid selection choices, straight from the branch metadata table.
    pub fn branch_names(&self) -> Vec<&str> {
        self.tables.branch_names()
    }

    /// The currently selected branch, if any.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Change the selection. Every view goes stale and all per-epoch
    /// memoization is dropped; nothing recomputes until a view is read.
    pub fn select_branch<S: Into<String>>(&mut self, branch: S) {
        let branch = branch.into();
        debug!("Selection changed to {:?}", branch);
        self.selection = Some(branch);
        self.epoch += 1;
        self.slices = None;
        self.title_groups = None;
        for view in self.views.values_mut() {
            view.state = ViewState::Stale;
        }
    }

    /// Current recomputation state of a view. Views that have never been
    /// read report as stale.
    pub fn view_state(&self, id: ViewId) -> ViewState {
        match self.views.get(&id) {
            Some(view) if view.epoch == self.epoch => view.state,
            _ => ViewState::Stale,
        }
    }

    /// Read a view, recomputing it first if it is stale for the current
    /// selection. Fails only when no branch has been selected yet; an
    /// unknown branch produces sentinel or empty outputs, never an error.
    pub fn view(&mut self, id: ViewId) -> Result<&ViewOutput, Error> {
        // Loop rather than branch: if a computation is superseded mid-flight
        // its result is discarded and the view is tried again. The selection
        // and epoch are re-read every attempt so a retry always runs against
        // the selection that superseded the last one.
        loop {
            if let Some(view) = self.views.get(&id) {
                if view.state == ViewState::Fresh && view.epoch == self.epoch {
                    break;
                }
            }
            let branch = self.selection.clone().ok_or(Error::NoSelection)?;
            let epoch = self.epoch;
            self.views.insert(
                id,
                CachedView {
                    state: ViewState::Computing,
                    epoch,
                    output: None,
                },
            );
            self.ensure_slices(&branch);
            let output = self.compute(id);
            // SAFETY: the entry was inserted just above.
            let view = self.views.get_mut(&id).unwrap();
            if self.epoch == epoch {
                debug!("View {} recomputed for epoch {}", id, epoch);
                *view = CachedView {
                    state: ViewState::Fresh,
                    epoch,
                    output: Some(output),
                };
            } else {
                debug!("View {} computed for superseded epoch {}, discarding", id, epoch);
                view.state = ViewState::Stale;
            }
        }
        // SAFETY: the loop only exits once a fresh entry with output exists.
        Ok(self
            .views
            .get(&id)
            .and_then(|v| v.output.as_ref())
            .unwrap())
    }

    /// Read a view by its published name.
    pub fn view_by_name(&mut self, name: &str) -> Result<&ViewOutput, Error> {
        let id = ViewId::from_name(name).ok_or_else(|| Error::NoSuchView(name.to_string()))?;
        self.view(id)
    }

    /// Eagerly recompute every view for the current selection.
    pub fn refresh_all(&mut self) -> Result<(), Error> {
        for id in ViewId::ALL {
            self.view(id)?;
        }
        Ok(())
    }

    /// Compute the branch slices for this epoch if they have not been
    /// computed yet. Every aggregation for the epoch shares the result.
    fn ensure_slices(&mut self, branch: &str) {
        if self.slices.is_none() {
            debug!("Computing branch slices for {:?}", branch);
            self.slices = Some(BranchSlices::compute(&self.tables, branch));
        }
    }

    fn ensure_title_groups(&mut self) {
        if self.title_groups.is_none() {
            // SAFETY: ensure_slices always runs before any compute call.
            let slices = self.slices.as_ref().unwrap();
            self.title_groups = Some(aggregate::checkouts_by_material_and_title(
                &self.tables,
                slices,
            ));
        }
    }

    fn compute(&mut self, id: ViewId) -> ViewOutput {
        if matches!(id, ViewId::TopBooks | ViewId::TopDvds) {
            self.ensure_title_groups();
        }
        // SAFETY: ensure_slices ran in view() before compute().
        let slices = self.slices.as_ref().unwrap();
        let tables = &self.tables;
        match id {
            ViewId::MedianIncome => ViewOutput::Scalar(aggregate::median_income(tables, slices)),
            ViewId::UninsuredRate => ViewOutput::Scalar(aggregate::uninsured_rate(tables, slices)),
            ViewId::UnemploymentRate => {
                ViewOutput::Scalar(aggregate::unemployment_rate(tables, slices))
            }
            ViewId::FoodInsecurityRate => {
                ViewOutput::Scalar(aggregate::food_insecurity_rate(tables, slices))
            }
            ViewId::AgeDistribution => {
                ViewOutput::Series(aggregate::age_distribution(tables, slices))
            }
            ViewId::RaceDistribution => {
                ViewOutput::Series(aggregate::race_distribution(tables, slices))
            }
            ViewId::MonthlyVisits => ViewOutput::Series(aggregate::monthly_visits(tables, slices)),
            ViewId::AttendanceByAudience => {
                ViewOutput::Table(aggregate::attendance_by_audience(tables, slices))
            }
            ViewId::ProgramScatter => ViewOutput::Points(aggregate::program_scatter(
                tables,
                slices,
                self.config.scatter_attendance_cap,
            )),
            ViewId::TotalStations => ViewOutput::Scalar(aggregate::total_stations(tables, slices)),
            ViewId::TotalSessions => ViewOutput::Scalar(aggregate::total_sessions(tables, slices)),
            ViewId::AvgSessionLength => {
                ViewOutput::Scalar(aggregate::average_session_length(tables, slices))
            }
            ViewId::TopGenres => {
                ViewOutput::Table(aggregate::top_genres(tables, slices, self.config.genre_limit))
            }
            ViewId::TopReadingLevels => ViewOutput::Table(aggregate::top_reading_levels(
                tables,
                slices,
                self.config.title_limit,
            )),
            ViewId::TopBooks => {
                // SAFETY: ensured above for this variant.
                let groups = self.title_groups.as_ref().unwrap();
                ViewOutput::Table(aggregate::top_books(groups, self.config.title_limit))
            }
            ViewId::TopDvds => {
                // SAFETY: ensured above for this variant.
                let groups = self.title_groups.as_ref().unwrap();
                ViewOutput::Table(aggregate::top_dvds(groups, self.config.title_limit))
            }
            ViewId::PhysicalReadingTrend => {
                ViewOutput::Trend(aggregate::physical_reading_trend(tables, slices))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tables::{BranchRecord, CensusRecord, TitleRecord};
    use crate::view::{Cell, Scalar};

    fn census(branch: &str, income: Option<f64>) -> CensusRecord {
        CensusRecord {
            branch_name: branch.to_string(),
            median_income: income,
            uninsured: Some(0.1),
            unemployment: Some(0.05),
            food_insecurity: Some(0.12),
            age_under_10: Some(100.0),
            age_10_to_20: Some(200.0),
            age_20_to_40: Some(300.0),
            age_40_to_60: Some(250.0),
            age_60_plus: Some(150.0),
            black: Some(0.5),
            white: Some(0.3),
            asian: Some(0.1),
            latino: Some(0.1),
        }
    }

    fn title(branch: &str, genre: &str, checkouts: u64) -> TitleRecord {
        TitleRecord {
            branch_name: branch.to_string(),
            title: format!("{} title", genre),
            genre: genre.to_string(),
            material_type: "BOOKS".to_string(),
            reading_level: "Adult".to_string(),
            checkouts: Some(checkouts),
        }
    }

    fn dashboard() -> Dashboard {
        let tables = SourceTables {
            branches: vec![
                BranchRecord { name: "Main".into() },
                BranchRecord { name: "South".into() },
            ],
            census: vec![census("Main", Some(55231.5)), census("South", None)],
            titles: vec![
                title("Main", "Mystery", 15),
                title("South", "Romance", 9),
            ],
            ..Default::default()
        };
        Dashboard::new(tables, Config::default())
    }

    fn scalar(output: &ViewOutput) -> Scalar {
        match output {
            ViewOutput::Scalar(s) => *s,
            other => panic!("expected a scalar view, got {:?}", other),
        }
    }

    #[test]
    fn reading_before_selection_is_an_error() {
        let mut dashboard = dashboard();
        assert!(matches!(
            dashboard.view(ViewId::MedianIncome),
            Err(Error::NoSelection)
        ));
    }

    #[test]
    fn views_are_stale_until_read_and_fresh_after() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        assert_eq!(dashboard.view_state(ViewId::MedianIncome), ViewState::Stale);
        dashboard.view(ViewId::MedianIncome).unwrap();
        assert_eq!(dashboard.view_state(ViewId::MedianIncome), ViewState::Fresh);
        // Other views stay stale until read themselves.
        assert_eq!(dashboard.view_state(ViewId::TopGenres), ViewState::Stale);
    }

    #[test]
    fn selection_change_invalidates_every_view() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        dashboard.refresh_all().unwrap();
        assert_eq!(dashboard.view_state(ViewId::TopGenres), ViewState::Fresh);
        dashboard.select_branch("South");
        for id in ViewId::ALL {
            assert_eq!(dashboard.view_state(id), ViewState::Stale);
        }
    }

    #[test]
    fn switching_branches_leaves_no_residual_values() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        assert_eq!(
            scalar(dashboard.view(ViewId::MedianIncome).unwrap()),
            Scalar::Value(55231.5)
        );
        let genres = match dashboard.view(ViewId::TopGenres).unwrap() {
            ViewOutput::Table(t) => t.clone(),
            other => panic!("expected a table, got {:?}", other),
        };
        assert_eq!(genres.rows[0][1], Cell::Text("Mystery".to_string()));

        dashboard.select_branch("South");
        // A matching row with a null field, not Main's value.
        assert_eq!(
            scalar(dashboard.view(ViewId::MedianIncome).unwrap()),
            Scalar::NotAvailable
        );
        let genres = match dashboard.view(ViewId::TopGenres).unwrap() {
            ViewOutput::Table(t) => t.clone(),
            other => panic!("expected a table, got {:?}", other),
        };
        assert_eq!(genres.rows[0][1], Cell::Text("Romance".to_string()));
    }

    #[test]
    fn unknown_branch_yields_sentinels_everywhere_never_errors() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Nonexistent Branch");
        for id in ViewId::ALL {
            match dashboard.view(id).unwrap() {
                ViewOutput::Scalar(s) => assert_eq!(*s, Scalar::NoData),
                ViewOutput::Series(s) => assert!(s.is_empty()),
                ViewOutput::Table(t) => assert!(t.is_empty()),
                ViewOutput::Points(p) => assert!(p.is_empty()),
                ViewOutput::Trend(t) => assert!(t.is_empty()),
            }
        }
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        let first = dashboard.view(ViewId::TopGenres).unwrap().clone();
        // Force a recomputation of the same selection.
        dashboard.select_branch("Main");
        let second = dashboard.view(ViewId::TopGenres).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn reselection_recomputes_slices_once_per_epoch() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        dashboard.view(ViewId::TopGenres).unwrap();
        let slices_after_first = dashboard.slices.clone();
        dashboard.view(ViewId::TopBooks).unwrap();
        // Second view reuses the memoized slices rather than refiltering.
        assert_eq!(dashboard.slices, slices_after_first);
        assert!(dashboard.title_groups.is_some());

        dashboard.select_branch("South");
        assert!(dashboard.slices.is_none());
        assert!(dashboard.title_groups.is_none());
    }

    #[test]
    fn view_lookup_by_name() {
        let mut dashboard = dashboard();
        dashboard.select_branch("Main");
        assert!(dashboard.view_by_name("median_income").is_ok());
        assert!(matches!(
            dashboard.view_by_name("bogus"),
            Err(Error::NoSuchView(_))
        ));
    }
}
