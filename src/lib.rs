// Slidedeck - slide rendering and raster PDF export
//
// Renders a deck of slide records into panels and exports every panel as
// one full-bleed page of a landscape PDF.

pub mod commands;
pub mod content;
pub mod error;
pub mod export;
pub mod panel;
pub mod pdf;
pub mod raster;

pub use commands::ExportTrigger;
pub use content::{default_deck, Deck, Slide, SlideRecord};
pub use error::{Error, Result};
pub use export::{
    ArtifactSink, DirectorySink, ExportOptions, ExportReport, Exporter, MemorySink,
    MissingContainerPolicy, MissingPanelPolicy, DEFAULT_FILE_NAME,
};
pub use panel::{DeckView, PanelSource, RenderedPanel, Theme};
pub use pdf::PageFormat;
pub use raster::{PanelRasterizer, RasterConfig, Rasterizer};

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

/// Render a slide deck and export it as a PDF.
#[derive(Parser, Debug)]
#[command(name = "slidedeck", version, about, long_about = None)]
pub struct Cli {
    /// Deck to export as JSON; the built-in deck is used when omitted
    #[arg(long)]
    pub deck: Option<PathBuf>,

    /// Directory the PDF is written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// File name of the PDF
    #[arg(long, default_value = DEFAULT_FILE_NAME)]
    pub file_name: String,

    /// What to do with slides that have no rendered panel
    #[arg(long, value_enum, default_value_t = MissingPanelPolicy::Skip)]
    pub on_missing_panel: MissingPanelPolicy,

    /// Image drawn in each card's pattern band (file, data or http URL)
    #[arg(long)]
    pub pattern_image: Option<Url>,

    /// Print the export report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "slidedeck=info".into());
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Entry point of the `slidedeck` binary.
pub fn run() {
    let cli = Cli::parse();
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            std::process::exit(1);
        }
    };

    match runtime.block_on(export(&cli)) {
        Ok(Some(report)) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!(error = %e, "failed to serialize report");
                        std::process::exit(1);
                    }
                }
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "export failed");
            std::process::exit(1);
        }
    }
}

async fn export(cli: &Cli) -> Result<Option<ExportReport>> {
    let deck = match &cli.deck {
        Some(path) => Deck::from_json_file(path)?,
        None => default_deck().clone(),
    };
    info!(title = %deck.title, slides = deck.len(), "deck loaded");

    let theme = Theme {
        pattern_image: cli.pattern_image.clone(),
        ..Theme::default()
    };
    let view = DeckView::mount(&deck, &theme);

    let rasterizer = PanelRasterizer::default();
    let options = ExportOptions {
        file_name: cli.file_name.clone(),
        on_missing_panel: cli.on_missing_panel,
        document_title: Some(deck.title.clone()),
        ..ExportOptions::default()
    };
    let exporter = Exporter::new(
        Arc::new(rasterizer),
        Arc::new(DirectorySink::new(cli.out_dir.clone())),
    )
    .with_options(options);

    let trigger = ExportTrigger::new(exporter);
    trigger.mount(Arc::new(view));
    info!(label = trigger.label(), "export requested");
    let report = trigger.trigger().await?;
    if let Some(location) = report.as_ref().and_then(|r| r.location.as_ref()) {
        info!(path = %location.display(), "saved");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_export_defaults() {
        let cli = Cli::parse_from(["slidedeck"]);
        assert_eq!(cli.file_name, DEFAULT_FILE_NAME);
        assert_eq!(cli.on_missing_panel, MissingPanelPolicy::Skip);
        assert!(cli.deck.is_none());
    }

    #[test]
    fn cli_parses_policy_and_pattern() {
        let cli = Cli::parse_from([
            "slidedeck",
            "--on-missing-panel",
            "fail",
            "--pattern-image",
            "https://example.com/pattern.png",
            "--json",
        ]);
        assert_eq!(cli.on_missing_panel, MissingPanelPolicy::Fail);
        assert_eq!(
            cli.pattern_image.unwrap().as_str(),
            "https://example.com/pattern.png"
        );
        assert!(cli.json);
    }

    #[test]
    fn raster_settings_are_not_exposed() {
        assert!(Cli::try_parse_from(["slidedeck", "--scale", "0"]).is_err());
    }

    #[tokio::test]
    async fn exports_default_deck_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "slidedeck",
            "--out-dir",
            dir.path().to_str().unwrap(),
        ]);
        let report = export(&cli).await.unwrap().unwrap();
        assert_eq!(report.page_count, 5);
        let path = dir.path().join(DEFAULT_FILE_NAME);
        assert_eq!(report.location.as_deref(), Some(path.as_path()));
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF"));
    }
}
