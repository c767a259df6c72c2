//! Teardown registry for resources created during a run.
//!
//! Components receive `&ResourceScope` explicitly and register a cleanup
//! action for everything they create (temporary binaries, the base
//! checkout). Actions run last-registered-first, exactly once, either on
//! [`ResourceScope::close`] or when the scope is dropped.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{BenchError, Result};

type CleanupFn = Box<dyn FnOnce() -> Result<()> + Send>;

struct CleanupAction {
    label: String,
    run: CleanupFn,
}

/// Mutex-guarded, append-only list of cleanup actions.
#[derive(Default)]
pub struct ResourceScope {
    actions: Mutex<Vec<CleanupAction>>,
}

impl ResourceScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup action. Safe to call from concurrent tasks.
    pub fn register<F>(&self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let label = label.into();
        debug!(action = %label, "registered teardown action");
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CleanupAction {
                label,
                run: Box::new(action),
            });
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every pending action in reverse registration order.
    ///
    /// All actions run even if some fail.
    ///
    /// # Errors
    ///
    /// Returns `Teardown` listing every failed action.
    pub fn close(&self) -> Result<()> {
        let actions = std::mem::take(
            &mut *self
                .actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let mut errors = Vec::new();
        for action in actions.into_iter().rev() {
            debug!(action = %action.label, "running teardown action");
            if let Err(e) = (action.run)() {
                errors.push(format!("{}: {e}", action.label));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BenchError::Teardown { errors })
        }
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "teardown on drop failed");
        }
    }
}
