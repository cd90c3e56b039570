//! IDLens - identity document analysis pipeline.
//!
//! Analyzes a directory of identity-document images with a vision
//! language model: a fixed per-image stage sequence (classification,
//! consistency check, free-text and structured PII extraction) fanned
//! out across a bounded worker pool, writing one JSONL record per
//! successfully processed image.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod sink;
