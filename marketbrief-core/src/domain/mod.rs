//! Domain types for the market brief pipeline

pub mod mood;
pub mod processed;
pub mod section;
pub mod snapshot;
pub mod symbols;

pub use mood::{mmi_from_vix, MoodZone};
pub use processed::{
    FlowStance, FlowSummary, MoodSummary, Movers, ProcessedDataset, QuoteRow, QuoteTable,
    RankedMover, SectionSummary, SourceRef, PROCESSED_SCHEMA_VERSION,
};
pub use section::Section;
pub use snapshot::{
    ClosePoint, FiiDiiActivity, FlowOrigin, Headline, MoodReading, Quote, QuoteSection, Sections,
    Snapshot, SNAPSHOT_SCHEMA_VERSION,
};
