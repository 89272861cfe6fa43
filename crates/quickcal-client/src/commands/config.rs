//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;

    if config.openai_config()?.api_key.is_none() {
        println!("warning: no OpenAI API key; set [openai] api_key or OPENAI_API_KEY");
    }

    #[cfg(feature = "google")]
    match config.google {
        Some(ref google) if google.client_id.is_some() => {
            println!("Google credentials are valid.");
        }
        _ => println!("warning: no Google credentials; run `quickcal auth google`"),
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
