//! Application state for the payroll API.

use std::sync::Arc;

use crate::engine::PayrollEngine;

/// Shared application state.
///
/// Holds the engine every handler works against.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<PayrollEngine>,
}

impl AppState {
    /// Creates a new application state around an engine.
    pub fn new(engine: Arc<PayrollEngine>) -> Self {
        Self { engine }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &PayrollEngine {
        &self.engine
    }
}
