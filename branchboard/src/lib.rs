//! Branchboard derives the views behind a branch-level report for a public
//! library system: pick a branch, and a registry of demographic,
//! circulation, and usage views recomputes against seven immutable source
//! tables.
//!
//! This crate provides the recomputation core and the CSV data-access layer.
//! For the command line front end that renders views as text, see the
//! `branchboard-cli` crate.

pub mod aggregate;
mod config;
mod dashboard;
mod datetime;
mod error;
mod slice;
pub mod tables;
mod view;

pub use config::Config;
pub use dashboard::{Dashboard, ViewState};
pub use datetime::{ClockTime, Month};
pub use error::Error;
pub use slice::BranchSlices;
pub use tables::SourceTables;
pub use view::{
    Cell, Column, ColumnKind, Scalar, ScatterPoint, Series, SeriesPoint, Table, TrendPoint, Unit,
    ViewId, ViewOutput,
};
