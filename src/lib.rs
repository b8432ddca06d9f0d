//! Skillscan - resume text extraction and skill matching service.
//!
//! Uploads PDF resumes to an object store, runs them through an external
//! text detection (OCR) service, matches the extracted text against a
//! configured skill vocabulary, enriches the matches with named entities
//! from an entity detection service, and records every run in an
//! experiment tracker.

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;
pub mod telemetry;
