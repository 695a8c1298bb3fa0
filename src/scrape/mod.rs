//! The scraping pipeline: classify the landing page, walk each section's
//! listing pages, resolve detail links per row, and assemble the snapshot.

pub mod assemble;
pub mod detail;
pub mod extract;
pub mod mode;
pub mod model;
pub mod paginate;

pub use assemble::SnapshotAssembler;
pub use detail::{DetailLinkResolver, Resolution};
pub use extract::{ExtractedRow, extract_section, extract_summary};
pub use mode::{PageMode, classify, read_notice};
pub use model::{
    DetailLink, ErrorEntry, MaintenanceNotice, ResultDocument, RunOutcome, SectionOutput,
    SectionRecord,
};
pub use paginate::{PageFailure, PageWalk, Paginator};
