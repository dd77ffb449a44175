//! Silent logger

use super::traits::{Level, Logger};

/// Discards every line
///
/// The default collaborator in unit tests and for embedders that install
/// no `tracing` subscriber of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn log(&self, _level: Level, _message: &str) {}
}
