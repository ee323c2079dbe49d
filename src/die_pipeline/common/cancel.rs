use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::die_pipeline::common::error::{ReadError, Result};

/// Cooperative cancellation for long lattice reads. Clones share one flag;
/// readers poll it between rows and tiles.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(ReadError::Cancelled) } else { Ok(()) }
    }
}
