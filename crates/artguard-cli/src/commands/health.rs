use anyhow::{Context, Result};
use artguard_core::config::ProtectionConfig;
use artguard_core::protection::ProtectionService;
use artguard_interaction::HttpProtectionService;

pub async fn run(config: &ProtectionConfig) -> Result<()> {
    let service = HttpProtectionService::from_config(&config.service);
    let health = service
        .health()
        .await
        .with_context(|| format!("Health probe to {} failed", service.base_url()))?;

    println!("Service:       {}", service.base_url());
    println!("Status:        {}", health.status.as_deref().unwrap_or("unknown"));
    println!(
        "Batch support: {}",
        if health.supports_batch() {
            "yes (POST /watermark_batch)"
        } else {
            "no (one POST /watermark per layer)"
        }
    );
    Ok(())
}
