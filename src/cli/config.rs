use crate::config::ChatConfig;
use crate::error::Result;

/// Execute the `config` command: print the effective configuration.
pub fn execute(config: &ChatConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

/// Effective configuration as TOML, with secrets masked.
pub fn render(config: &ChatConfig) -> Result<String> {
    let mut masked = config.clone();
    for provider in &mut masked.providers {
        for secret in [&mut provider.api_key, &mut provider.secret_key] {
            if secret.is_some() {
                *secret = Some("********".to_string());
            }
        }
    }
    Ok(toml::to_string_pretty(&masked)?)
}
