use crate::context::build_pipeline;
use anyhow::{Context, Result};
use artguard_application::{FallbackStatus, ProtectionSessionManager, TriggerOutcome};
use artguard_core::capture::MatrixPreset;
use artguard_core::config::ProtectionConfig;
use artguard_core::session::SessionEvent;
use tokio::sync::broadcast::error::TryRecvError;

const TOOLS: [&str; 3] = ["brush", "smudge", "eraser"];

pub async fn run(mut config: ProtectionConfig, matrix: Option<MatrixPreset>, strokes: u32) -> Result<()> {
    if let Some(preset) = matrix {
        config.capture.matrix = preset;
        config.capture.custom_matrix = None;
    }
    let layer_count = config.capture.layer_matrix().layer_count();

    let context = build_pipeline(&config)?;
    let manager = ProtectionSessionManager::new(context.pipeline.clone(), config.session.clone());
    let mut events = manager.subscribe();

    let session = manager
        .start_session()
        .await
        .context("Failed to start session")?;
    println!(
        "Session {} started ({} layers per cycle, batch support: {})",
        session.id,
        layer_count,
        context.pipeline.delivery().batch_supported()
    );

    for stroke in 0..strokes {
        manager.record_stroke().await?;
        manager.record_tool(TOOLS[stroke as usize % TOOLS.len()]).await?;
        manager.set_complexity(stroke as f32 * 0.75).await?;
        if let Some(outcome) = manager.tick().await {
            print_outcome(&outcome);
        }
    }

    let outcome = manager.end_session().await;
    print_outcome(&outcome);

    loop {
        match events.try_recv() {
            Ok(event) => {
                tracing::debug!("[artguard] event: {}", serde_json::to_string(&event)?);
                if let SessionEvent::SessionEnded { cycles, .. } = event {
                    println!("Session closed after {} cycle(s)", cycles);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!("[artguard] {} events skipped", skipped);
            }
            Err(_) => break,
        }
    }

    if let Some(cycle) = outcome.cycle() {
        match &cycle.fallback {
            FallbackStatus::NotNeeded if cycle.persisted => println!(
                "Report saved to {}",
                context.reports_dir.join(cycle.report.session_id()).display()
            ),
            FallbackStatus::NotNeeded => println!("Report could not be saved; see log"),
            FallbackStatus::Written(receipt) => println!(
                "Delivery failed; {} payloads backed up to {}",
                receipt.files_written,
                receipt.directory.display()
            ),
            FallbackStatus::Failed(error) => {
                anyhow::bail!(
                    "Delivery and local backup under {} both failed: {}",
                    context.backup_dir.display(),
                    error
                )
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Completed(cycle) => {
            println!("{}", cycle.report.summary());
            if let Some(preview) = cycle.report.primary_preview() {
                println!("  primary preview: {}", preview);
            }
        }
        TriggerOutcome::Ignored { reason } => println!("Trigger ignored: {}", reason),
    }
}
