//! Market Brief Runner: the fetch, prepare and report stages.
//!
//! This crate builds on `marketbrief-core` to provide:
//! - Fetch: query every provider and write one dated raw snapshot
//! - Prepare: validate a snapshot and derive the processed dataset
//! - Report: render the dataset to a page-capped PDF and a flat CSV
//!
//! Stages share nothing but the filesystem; each reads exactly one dated
//! artifact written by the previous stage.

pub mod artifacts;
pub mod fetch;
pub mod prepare;
pub mod report;

pub use artifacts::{ArtifactKind, LocateError};
pub use fetch::{
    fetch_snapshot, run_fetch, write_snapshot, CachedFlowProvider, FetchOutcome, Providers,
    WrittenSnapshot, FLOW_CACHE_FILE,
};
pub use prepare::{
    load_snapshot, locate_snapshot, prepare, processed_tables, rank_movers, run_prepare,
    write_processed, write_processed_tables, LoadedSnapshot, PrepareError, PrepareOutcome,
};
pub use report::{
    export_csv, load_processed, render_pdf, run_generate, GenerateOutcome, LoadedDataset,
    RenderedReport, ReportError,
};
