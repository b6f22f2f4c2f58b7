//! Core record pipeline for drivedocs.
//!
//! This crate ties the Drive collaborators and the keyword extractor
//! together: per-file transforms ([`record`]), the sequential batch
//! ([`pipeline`]), and record output ([`output`]).

pub mod output;
pub mod pipeline;
pub mod record;

pub use pipeline::{
    BatchConfig, BuildReport, FileFailure, ProgressReporter, RecordBuilder, SilentProgress,
    run_batch, validate_batch_date,
};
