//! The user-facing export trigger.
//!
//! Mirrors a download button: it reflects the export flag in its label and
//! enabled state, and refuses to start a second export while one runs.

use crate::error::{Error, Result};
use crate::export::{ExportReport, Exporter};
use crate::panel::PanelSource;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Label shown while idle.
pub const IDLE_LABEL: &str = "Download PDF";
/// Label shown while an export is running.
pub const BUSY_LABEL: &str = "Preparing PDF…";

/// Starts exports of whatever container is currently mounted.
pub struct ExportTrigger {
    exporter: Exporter,
    container: Mutex<Option<Arc<dyn PanelSource>>>,
}

impl ExportTrigger {
    pub fn new(exporter: Exporter) -> Self {
        Self {
            exporter,
            container: Mutex::new(None),
        }
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Attach the container to export from.
    pub fn mount(&self, container: Arc<dyn PanelSource>) {
        *self.container.lock().unwrap_or_else(|e| e.into_inner()) = Some(container);
    }

    /// Detach the container, returning it if one was mounted.
    pub fn unmount(&self) -> Option<Arc<dyn PanelSource>> {
        self.container
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    pub fn is_enabled(&self) -> bool {
        !self.exporter.is_exporting()
    }

    pub fn label(&self) -> &'static str {
        if self.exporter.is_exporting() {
            BUSY_LABEL
        } else {
            IDLE_LABEL
        }
    }

    /// Run one export.
    ///
    /// Fails with [`Error::ExportInProgress`] instead of starting a
    /// concurrent run. Without a mounted container this behaves like
    /// [`Exporter::run_export`] with `None`.
    pub async fn trigger(&self) -> Result<Option<ExportReport>> {
        let container = self
            .container
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(container) = container else {
            return self.exporter.missing_container();
        };

        let state = self.exporter.state().clone();
        let Some(_guard) = state.try_begin() else {
            debug!("export requested while another is running");
            return Err(Error::ExportInProgress);
        };
        self.exporter
            .export_panels(container.as_ref())
            .await
            .map(Some)
    }
}
