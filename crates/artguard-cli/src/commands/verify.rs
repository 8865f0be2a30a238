use crate::context::build_pipeline;
use anyhow::{Context, Result};
use artguard_application::VERIFY_LAYER_ID;
use artguard_core::config::ProtectionConfig;
use std::path::Path;

pub async fn run(config: ProtectionConfig, file: &Path) -> Result<()> {
    let image = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let context = build_pipeline(&config)?;
    let report = context
        .pipeline
        .verify(&image)
        .await
        .context("Verify request failed")?;

    match report.result(VERIFY_LAYER_ID) {
        Some(layer) if layer.protected => println!(
            "{}: watermark detected (confidence {:.1}%)",
            file.display(),
            layer.bit_accuracy * 100.0
        ),
        Some(layer) => println!(
            "{}: no watermark detected ({})",
            file.display(),
            layer.error.as_deref().unwrap_or("no detail")
        ),
        None => println!("{}: service returned no result", file.display()),
    }
    Ok(())
}
