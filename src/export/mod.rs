//! Export controller.
//!
//! Walks the mounted panels in order, captures each one, and appends one
//! full-bleed page per capture. Captures are strictly sequential so at most
//! one bitmap is alive at a time.

mod sink;
mod state;

pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use state::{ExportGuard, ExportState};

use crate::error::{Error, Result};
use crate::panel::PanelSource;
use crate::pdf::{PageFormat, SlideDocument};
use crate::raster::Rasterizer;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File name of the exported document.
pub const DEFAULT_FILE_NAME: &str = "english-literature-benefits.pdf";

/// What to do when a slot of the container holds no panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingPanelPolicy {
    /// Emit no page for the slot and continue.
    #[default]
    Skip,
    /// Abort the export.
    Fail,
}

/// What to do when export is invoked without a mounted container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingContainerPolicy {
    /// Return without exporting and without touching the export state.
    #[default]
    Ignore,
    /// Report [`Error::MissingContainer`].
    Fail,
}

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub file_name: String,
    pub page_format: PageFormat,
    pub on_missing_panel: MissingPanelPolicy,
    pub on_missing_container: MissingContainerPolicy,
    /// Written to the document information dictionary.
    pub document_title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            page_format: PageFormat::A4_LANDSCAPE,
            on_missing_panel: MissingPanelPolicy::default(),
            on_missing_container: MissingContainerPolicy::default(),
            document_title: None,
        }
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub file_name: String,
    /// Where the sink stored the document, if on the filesystem.
    pub location: Option<PathBuf>,
    pub page_count: usize,
    /// Container indices that produced no page.
    pub skipped: Vec<usize>,
}

/// Drives the export pipeline.
#[derive(Clone)]
pub struct Exporter {
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn ArtifactSink>,
    options: ExportOptions,
    state: Arc<ExportState>,
}

impl Exporter {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            rasterizer,
            sink,
            options: ExportOptions::default(),
            state: Arc::new(ExportState::new()),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Share an existing status flag, e.g. one the interface already watches.
    pub fn with_state(mut self, state: Arc<ExportState>) -> Self {
        self.state = state;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn state(&self) -> &Arc<ExportState> {
        &self.state
    }

    pub fn is_exporting(&self) -> bool {
        self.state.is_exporting()
    }

    /// Export every panel of `container` into one document.
    ///
    /// Returns `Ok(None)` without touching the export state when no container
    /// is mounted and the policy is [`MissingContainerPolicy::Ignore`].
    pub async fn run_export(
        &self,
        container: Option<&dyn PanelSource>,
    ) -> Result<Option<ExportReport>> {
        let Some(container) = container else {
            return self.missing_container();
        };
        let _guard = self.state.begin();
        self.export_panels(container).await.map(Some)
    }

    pub(crate) fn missing_container(&self) -> Result<Option<ExportReport>> {
        match self.options.on_missing_container {
            MissingContainerPolicy::Ignore => {
                debug!("no container mounted, nothing to export");
                Ok(None)
            }
            MissingContainerPolicy::Fail => Err(Error::MissingContainer),
        }
    }

    /// The export itself. Callers hold the export guard.
    pub(crate) async fn export_panels(&self, container: &dyn PanelSource) -> Result<ExportReport> {
        info!(
            panels = container.len(),
            file = %self.options.file_name,
            "export started"
        );
        let result = self.assemble(container).await;
        match &result {
            Ok(report) => info!(
                pages = report.page_count,
                skipped = report.skipped.len(),
                "export finished"
            ),
            Err(e) => warn!(error = %e, "export failed"),
        }
        result
    }

    async fn assemble(&self, container: &dyn PanelSource) -> Result<ExportReport> {
        let mut document = SlideDocument::new(self.options.page_format);
        if let Some(title) = &self.options.document_title {
            document = document.with_title(title.clone());
        }

        let mut placed = 0;
        let mut skipped = Vec::new();
        for index in 0..container.len() {
            let Some(panel) = container.panel(index) else {
                match self.options.on_missing_panel {
                    MissingPanelPolicy::Skip => {
                        warn!(index, "panel not mounted, skipping");
                        skipped.push(index);
                        continue;
                    }
                    MissingPanelPolicy::Fail => return Err(Error::MissingPanel(index)),
                }
            };

            let bitmap = self
                .rasterizer
                .capture(panel)
                .await
                .map_err(|e| match e {
                    Error::Rasterization { .. } => e,
                    other => Error::Rasterization {
                        index,
                        reason: other.to_string(),
                    },
                })?;
            debug!(
                index,
                id = %panel.id,
                width = bitmap.width(),
                height = bitmap.height(),
                "panel captured"
            );
            let payload = bitmap.to_png()?;
            drop(bitmap);

            // The first image goes on the document's initial page
            if placed > 0 {
                document.add_page();
            }
            let page = document.page_size();
            document.place_image(payload, 0.0, 0.0, page.width, page.height)?;
            placed += 1;
        }

        if placed == 0 {
            // The initial page stays blank; the document is still delivered
            warn!("no panel was captured, delivering a blank page");
        }

        let page_count = document.page_count();
        let bytes = document.finish()?;
        let location = self.sink.save(&self.options.file_name, &bytes)?;
        info!(
            file = %self.options.file_name,
            bytes = bytes.len(),
            "document delivered"
        );

        Ok(ExportReport {
            file_name: self.options.file_name.clone(),
            location,
            page_count,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::default_deck;
    use crate::panel::{DeckView, RenderedPanel, Theme};
    use crate::raster::Bitmap;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use lopdf::content::Content;
    use lopdf::Document;
    use std::sync::Mutex;

    /// Produces a tiny bitmap per panel and records what it saw.
    #[derive(Default)]
    struct FakeRasterizer {
        fail_on: Option<String>,
        state: Option<Arc<ExportState>>,
        seen: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl Rasterizer for FakeRasterizer {
        async fn capture(&self, panel: &RenderedPanel) -> Result<Bitmap> {
            let exporting = self.state.as_ref().map_or(false, |s| s.is_exporting());
            self.seen.lock().unwrap().push((panel.id.clone(), exporting));
            tokio::task::yield_now().await;
            if self.fail_on.as_deref() == Some(panel.id.as_str()) {
                return Err(Error::Resource("unreachable pattern image".into()));
            }
            Ok(Bitmap::from(RgbImage::from_pixel(4, 3, Rgb([255, 255, 255]))))
        }
    }

    fn view() -> DeckView {
        DeckView::mount(default_deck(), &Theme::default())
    }

    fn exporter(rasterizer: Arc<FakeRasterizer>, sink: Arc<MemorySink>) -> Exporter {
        Exporter::new(rasterizer, sink)
    }

    fn page_ids(bytes: &[u8]) -> (Document, Vec<lopdf::ObjectId>) {
        let doc = Document::load_mem(bytes).unwrap();
        let ids = doc.get_pages().into_values().collect();
        (doc, ids)
    }

    #[tokio::test]
    async fn exports_one_page_per_panel_in_order() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let sink = Arc::new(MemorySink::new());
        let exporter = exporter(rasterizer.clone(), sink.clone());

        let view = view();
        let report = exporter.run_export(Some(&view)).await.unwrap().unwrap();
        assert_eq!(report.page_count, 5);
        assert!(report.skipped.is_empty());
        assert_eq!(report.file_name, DEFAULT_FILE_NAME);

        let seen: Vec<_> = rasterizer.seen.lock().unwrap().iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(seen, vec!["slide-1", "slide-2", "slide-3", "slide-4", "slide-5"]);

        let artifacts = sink.artifacts();
        assert_eq!(artifacts.len(), 1);
        let (_, ids) = page_ids(&artifacts[0].1);
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn missing_panel_is_skipped_without_a_blank_page() {
        for absent in [0, 2, 4] {
            let sink = Arc::new(MemorySink::new());
            let exporter = exporter(Arc::new(FakeRasterizer::default()), sink.clone());
            let mut view = view();
            view.unmount(absent);

            let report = exporter.run_export(Some(&view)).await.unwrap().unwrap();
            assert_eq!(report.page_count, 4);
            assert_eq!(report.skipped, vec![absent]);

            let (doc, ids) = page_ids(&sink.artifacts()[0].1);
            assert_eq!(ids.len(), 4);
            for id in ids {
                let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
                assert!(content.operations.iter().any(|op| op.operator == "Do"));
            }
        }
    }

    #[tokio::test]
    async fn missing_panel_can_fail_the_export() {
        let sink = Arc::new(MemorySink::new());
        let exporter = exporter(Arc::new(FakeRasterizer::default()), sink.clone()).with_options(
            ExportOptions {
                on_missing_panel: MissingPanelPolicy::Fail,
                ..ExportOptions::default()
            },
        );
        let mut view = view();
        view.unmount(3);
        let err = exporter.run_export(Some(&view)).await.unwrap_err();
        assert!(matches!(err, Error::MissingPanel(3)));
        assert!(sink.artifacts().is_empty());
        assert!(!exporter.is_exporting());
    }

    #[tokio::test]
    async fn missing_container_is_a_no_op_by_default() {
        let sink = Arc::new(MemorySink::new());
        let exporter = exporter(Arc::new(FakeRasterizer::default()), sink.clone());
        let mut rx = exporter.state().subscribe();

        assert_eq!(exporter.run_export(None).await.unwrap(), None);
        assert!(sink.artifacts().is_empty());
        assert!(!exporter.is_exporting());
        assert!(!rx.has_changed().unwrap());

        let strict = exporter.with_options(ExportOptions {
            on_missing_container: MissingContainerPolicy::Fail,
            ..ExportOptions::default()
        });
        assert!(matches!(
            strict.run_export(None).await,
            Err(Error::MissingContainer)
        ));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn flag_is_raised_for_the_whole_run() {
        let state = Arc::new(ExportState::new());
        let rasterizer = Arc::new(FakeRasterizer {
            state: Some(state.clone()),
            ..FakeRasterizer::default()
        });
        let exporter =
            exporter(rasterizer.clone(), Arc::new(MemorySink::new())).with_state(state.clone());

        assert!(!state.is_exporting());
        exporter.run_export(Some(&view())).await.unwrap();
        assert!(!state.is_exporting());
        assert!(rasterizer.seen.lock().unwrap().iter().all(|(_, exporting)| *exporting));
    }

    #[tokio::test]
    async fn failure_on_third_slide_aborts_and_resets() {
        let rasterizer = Arc::new(FakeRasterizer {
            fail_on: Some("slide-3".into()),
            ..FakeRasterizer::default()
        });
        let sink = Arc::new(MemorySink::new());
        let exporter = exporter(rasterizer.clone(), sink.clone());

        let err = exporter.run_export(Some(&view())).await.unwrap_err();
        match err {
            Error::Rasterization { index, reason } => {
                assert_eq!(index, 2);
                assert!(reason.contains("unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.artifacts().is_empty());
        assert!(!exporter.is_exporting());
        // nothing after the failing slide is captured
        assert_eq!(rasterizer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn container_without_panels_delivers_one_blank_page() {
        for slots in [vec![None, None, None], vec![]] {
            let count = slots.len();
            let sink = Arc::new(MemorySink::new());
            let rasterizer = Arc::new(FakeRasterizer::default());
            let exporter = exporter(rasterizer.clone(), sink.clone());
            let empty = DeckView::from_panels(slots);

            let report = exporter.run_export(Some(&empty)).await.unwrap().unwrap();
            assert_eq!(report.page_count, 1);
            assert_eq!(report.skipped, (0..count).collect::<Vec<_>>());
            assert!(rasterizer.seen.lock().unwrap().is_empty());
            assert!(!exporter.is_exporting());

            let artifacts = sink.artifacts();
            assert_eq!(artifacts.len(), 1);
            let (doc, ids) = page_ids(&artifacts[0].1);
            assert_eq!(ids.len(), 1);
            let content = Content::decode(&doc.get_page_content(ids[0]).unwrap()).unwrap();
            assert!(content.operations.is_empty());
        }
    }
}
