//! Subcommand implementations.

pub mod add;
#[cfg(feature = "google")]
pub mod auth;
pub mod config;
pub mod host;
pub mod parse;

use chrono_tz::Tz;
use tracing::{debug, warn};

use quickcal_providers::OpenAiResolver;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::flow::EventFlow;

/// Whether a command needs the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publishing {
    /// Resolve only.
    Off,
    /// A publisher is required; configuration problems are errors.
    Required,
    /// Attach a publisher if the configuration allows, otherwise serve
    /// resolution alone.
    BestEffort,
}

/// Wires the resolver (and publisher) described by `config`.
pub fn build_flow(config: &ClientConfig, timezone: Tz, publishing: Publishing) -> ClientResult<EventFlow> {
    let resolver = OpenAiResolver::new(config.openai_config()?)?;
    let flow = EventFlow::new(Box::new(resolver), timezone);

    if publishing == Publishing::Off {
        return Ok(flow);
    }

    match build_publisher(config) {
        Ok(Some(publisher)) => Ok(flow.with_publisher(publisher)),
        Ok(None) => {
            debug!("no calendar configured");
            Ok(flow)
        }
        Err(e) if publishing == Publishing::BestEffort => {
            warn!("calendar unavailable: {}", e);
            Ok(flow)
        }
        Err(e) => Err(e),
    }
}

#[cfg(feature = "google")]
fn build_publisher(
    config: &ClientConfig,
) -> ClientResult<Option<Box<dyn quickcal_providers::EventPublisher>>> {
    use quickcal_providers::google::GooglePublisher;

    let Some(ref google) = config.google else {
        return Ok(None);
    };
    let publisher = GooglePublisher::new(google.to_provider_config()?.with_interactive(true))?;
    Ok(Some(Box::new(publisher)))
}

#[cfg(not(feature = "google"))]
fn build_publisher(
    _config: &ClientConfig,
) -> ClientResult<Option<Box<dyn quickcal_providers::EventPublisher>>> {
    Ok(None)
}
