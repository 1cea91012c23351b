// Main entry point - Configuration, dependency injection and the pipeline run
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::application::chart_service::{ChartOptions, ChartService};
use crate::application::collection_service::CollectionService;
use crate::application::series_store::SeriesStore;
use crate::domain::timezone::{resolve_timezone, ChartZone};
use crate::infrastructure::chart_document::HtmlChartWriter;
use crate::infrastructure::config::{load_settings, Settings};
use crate::infrastructure::diagnostics::DiagnosticsWriter;
use crate::infrastructure::gist_store::GistSeriesStore;
use crate::infrastructure::portal_source::PortalSampleSource;
use crate::presentation::cli::{Args, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = load_settings(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;

    let store: Arc<dyn SeriesStore> =
        Arc::new(GistSeriesStore::new(&settings.store).context("Failed to set up the series store")?);

    match args.command() {
        Command::Collect => collect(&settings, store).await,
        Command::Render => render(&settings, store).await,
        Command::Run => {
            collect(&settings, store.clone()).await?;
            render(&settings, store).await
        }
    }
}

async fn collect(settings: &Settings, store: Arc<dyn SeriesStore>) -> anyhow::Result<()> {
    let diagnostics = DiagnosticsWriter::new(
        settings.diagnostics.report_path.clone(),
        settings.diagnostics.page_path.clone(),
    );
    let source = PortalSampleSource::new(settings.portal.clone(), settings.browser.clone(), diagnostics);

    let sample = CollectionService::new(Box::new(source), store)
        .collect()
        .await
        .context("Collecting the quota failed")?;
    tracing::info!("Collected {} at {}", sample.remaining_data, sample.date);
    Ok(())
}

async fn render(settings: &Settings, store: Arc<dyn SeriesStore>) -> anyhow::Result<()> {
    let writer = Arc::new(HtmlChartWriter::new(settings.chart.output_path.clone()));
    let service = ChartService::new(store, writer, chart_options(settings));

    service.render(Utc::now()).await.context("Rendering the chart failed")?;
    Ok(())
}

fn chart_options(settings: &Settings) -> ChartOptions {
    let timezone = resolve_timezone(settings.timezone.as_deref());
    let display_zone = ChartZone::from_descriptor(&timezone);
    let bucket_zone = if settings.bucket_in_local_time {
        ChartZone::Local
    } else {
        display_zone
    };
    tracing::info!("Chart timezone: {} ({})", timezone.timezone, timezone.timezone_display);

    ChartOptions {
        title: settings.chart.title.clone(),
        timezone,
        display_zone,
        bucket_zone,
    }
}
