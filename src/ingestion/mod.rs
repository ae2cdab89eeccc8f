//! Sequential stage drivers with per-document failure isolation.
//!
//! * [`extract`] — stage 1: enumerate blobs, extract text, stage locally.
//! * [`embed`] — stage 2: chunk staged files, embed, upload to the index.
//! * [`report`] — accumulated outcomes surfaced at the end of each run.
//!
//! One document's failure never aborts a batch: each loop records the
//! failure and moves on, and only batch-level errors (listing, index
//! schema) propagate.

pub mod embed;
pub mod extract;
pub mod report;

pub use embed::index_staged_files;
pub use extract::ingest_documents;
pub use report::{DocumentFailure, IndexingReport, IngestionReport};
