use std::path::Path;

use anyhow::Error;

use crate::types::{ExtractionReport, Rejection};

mod render;

/// Human-readable progress output for the extraction loop
pub struct Console;

impl Console {
    /// Display a banner naming the document and model
    pub fn display_welcome(document: &Path, model: &str, max_attempts: u32) {
        render::display_welcome(document, model, max_attempts);
    }

    /// Announce an extractor round
    pub fn display_attempt(attempt: u32, max_attempts: u32, retry: bool) {
        render::display_attempt(attempt, max_attempts, retry);
    }

    /// Show every defect the validator found
    pub fn display_rejection(rejection: &Rejection) {
        render::display_rejection(rejection);
    }

    /// Display the accepted record
    pub fn display_report(report: &ExtractionReport) {
        render::display_report(report);
    }

    /// Display an error message with context-aware tips
    pub fn display_error(error: &Error) {
        render::display_error(error);
    }

    pub fn display_cancelled() {
        render::display_cancelled();
    }
}
