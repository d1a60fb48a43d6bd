//! Marginalia renderer
//!
//! Paints stored marks into a content document and prints the result.
//!
//! Usage: `marginalia <document.xhtml> <records.json> [user-id]`

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marginalia::config::RenderJob;
use marginalia::inject::inject_marks;
use marginalia::marks::load_records;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration. Must run before the filter reads RUST_LOG.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "marginalia=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let job = RenderJob::from_env_and_args(&args)
        .context("Missing document or records path (pass them as arguments or set MARGINALIA_DOCUMENT / MARGINALIA_RECORDS)")?;

    tracing::info!("Starting Marginalia v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Document: {}", job.document_path);
    tracing::info!("Records: {}", job.records_path);

    let html = tokio::fs::read_to_string(&job.document_path)
        .await
        .with_context(|| format!("Failed to read {}", job.document_path))?;
    let records = load_records(&job.records_path)
        .await
        .with_context(|| format!("Failed to load records from {}", job.records_path))?;

    let result = inject_marks(&html, &records, &job.user_id, &job.marker)
        .context("Failed to inject marks")?;

    tracing::info!(
        records = records.len(),
        painted = result.painted,
        dropped = result.dropped,
        "Rendered marks"
    );
    for group_id in &result.orphaned {
        tracing::warn!(group_id = %group_id, "Annotation could not be anchored");
    }

    println!("{}", result.html);
    Ok(())
}
