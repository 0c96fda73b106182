//! Heritage site enrichment.
//!
//! For each site in an input dataset: search for its source page, fetch
//! it (plain HTTP or headless Chrome, depending on the site type), pull out
//! a summary and body text, and write one output row per input row.

pub mod config;
pub mod dataset;
pub mod discovery;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod scrapers;
