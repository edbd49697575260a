//! Extraction and normalization pipeline for used-vehicle classified-ad
//! listings: turns rendered listing-page HTML into validated structured
//! records, with a multi-criteria filter engine and display transforms
//! over the extracted records.
//!
//! The pipeline itself is pure and synchronous; retrieval, persistence
//! and presentation are the caller's concern.

pub mod cli;
pub mod display;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod utils;

// Re-export common types
pub use model::{
    ExtractedListing, ExtractionError, ExtractionResult, FilterCriteria, RawDocument,
};
pub use pipeline::{assemble, assemble_with_filter, format_inr, parse_amount, ImageFilter};
pub use query::filter_listings;
pub use display::mask_owner_name;
