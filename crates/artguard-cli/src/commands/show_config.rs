use anyhow::{Context, Result};
use artguard_core::config::ProtectionConfig;

pub fn run(config: &ProtectionConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.service.api_key.is_some() {
        shown.service.api_key = Some("********".to_string());
    }
    let rendered = shown.to_toml().context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}
