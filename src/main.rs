use std::sync::Arc;

use anyhow::Context;
use refund_intake::clients::{CaseApi, GraphMail, MailStore, NovaClient, OrchestratorQueue, WorkQueue};
use refund_intake::config::{ProcessArgs, Settings};
use refund_intake::pipeline::IntakePipeline;
use refund_intake::report::RunReporter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = ProcessArgs::from_env().context("reading process arguments")?;
    let settings = Settings::from_env()
        .context("reading settings")?
        .with_overrides(&args);

    eprintln!("📨 Refund Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {}", settings.mailbox);
    eprintln!(
        "   Folder: {} → {}",
        settings.source_folder, settings.destination_folder
    );
    eprintln!("   Case: {} ({})", settings.case_profile.title, settings.case_profile.kle_number);
    eprintln!("   Receivers: {}\n", args.receivers.join(", "));

    let mail: Arc<dyn MailStore> = Arc::new(
        GraphMail::connect(&settings.graph)
            .await
            .context("connecting to the mail service")?,
    );
    let cases: Arc<dyn CaseApi> = Arc::new(
        NovaClient::connect(&settings.nova)
            .await
            .context("connecting to the case service")?,
    );
    let queue: Arc<dyn WorkQueue> = Arc::new(OrchestratorQueue::new(&settings.queue));

    let pipeline = IntakePipeline::new(mail, cases, queue, &settings);
    let summary = pipeline.run().await?;

    let reporter = RunReporter::new(&settings.smtp, settings.status_sender.clone());
    reporter.send_summary(summary.processed, &args.receivers)?;

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        "Run complete"
    );
    Ok(())
}
