//! The `is_exporting` flag and its scoped guard.

use tokio::sync::watch;

/// Process-wide export status shared by the controller and the trigger.
///
/// Transitions are published on a watch channel so interfaces can follow
/// them without polling.
#[derive(Debug)]
pub struct ExportState {
    tx: watch::Sender<bool>,
}

impl Default for ExportState {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exporting(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receive every change of the flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Mark an export as running until the guard drops.
    pub fn begin(&self) -> ExportGuard<'_> {
        self.tx.send_replace(true);
        ExportGuard { state: self }
    }

    /// Like [`begin`](Self::begin), but only if no export is running.
    pub fn try_begin(&self) -> Option<ExportGuard<'_>> {
        let mut acquired = false;
        self.tx.send_if_modified(|exporting| {
            if *exporting {
                false
            } else {
                *exporting = true;
                acquired = true;
                true
            }
        });
        acquired.then(|| ExportGuard { state: self })
    }
}

/// Resets the flag to idle when dropped, on success, error or panic unwind.
#[must_use = "the export is marked idle as soon as the guard is dropped"]
pub struct ExportGuard<'a> {
    state: &'a ExportState,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.state.tx.send_replace(false);
    }
}
