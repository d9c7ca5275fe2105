mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use gallery_engine::{CanvasClient, CdpBrowser, GalleryPipeline};
use gallery_logging::{gallery_info, gallery_warn};

use crate::config::{AppConfig, BrowserSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    logging::initialize_from_env();
    if let Err(err) = dotenv {
        if !err.not_found() {
            gallery_warn!("Ignoring unreadable .env file: {}", err);
        }
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    gallery_info!(
        "Building gallery for course {} assignment {}",
        config.listing.course_id,
        config.listing.assignment_id
    );

    let canvas = Arc::new(
        CanvasClient::new(config.listing.clone()).context("could not build HTTP client")?,
    );

    let viewport = config.pipeline.capture.viewport;
    let browser = match &config.browser {
        BrowserSource::Attach(debug_url) => {
            gallery_info!("Attaching to browser at {}", debug_url);
            CdpBrowser::discover(debug_url, viewport).await
        }
        BrowserSource::Launch(binary) => {
            gallery_info!("Launching headless browser {}", binary);
            CdpBrowser::launch(binary, viewport).await
        }
    }
    .context("browser unavailable")?;
    let browser = Arc::new(browser);

    let pipeline = GalleryPipeline::new(
        config.pipeline.clone(),
        canvas.clone(),
        canvas,
        browser.clone(),
    );
    gallery_info!(
        "Publishing gallery to {}",
        pipeline.publisher().document_path().display()
    );
    let outcome = pipeline.run().await;
    // An attached browser belongs to someone else; leave it running.
    if matches!(config.browser, BrowserSource::Launch(_)) {
        browser.close().await;
    }

    let summary = outcome.context("gallery run failed")?;
    gallery_info!(
        "Done: {} of {} pages captured, {} failed. Open {}",
        summary.succeeded(),
        summary.total(),
        summary.failed(),
        summary.document.display()
    );
    Ok(())
}
