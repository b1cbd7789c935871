//! Shared application state, constructed once after the boot sequence.

use std::sync::Arc;
use std::time::Instant;

use mednucleus_schema::BootReport;

#[derive(Clone)]
pub struct AppState {
    /// Outcome of the startup schema-evolution pass. Immutable for the
    /// life of the process; a new deploy gets a new report.
    pub boot: Arc<BootReport>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(boot: BootReport) -> Self {
        Self {
            boot: Arc::new(boot),
            start_time: Instant::now(),
        }
    }
}
