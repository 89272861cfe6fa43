//! Command-line interface definition.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// quickcal - natural-language text to calendar events
#[derive(Debug, Parser)]
#[command(name = "quickcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKCAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// IANA timezone to interpret input in (e.g. Europe/Paris)
    #[arg(long, env = "QUICKCAL_TIMEZONE", global = true)]
    pub timezone: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// True when the process is serving the browser rather than a terminal.
    pub fn is_host(&self) -> bool {
        matches!(self.command, Command::Host)
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a calendar event from a description
    Add {
        /// Event description, e.g. "lunch with Sam tomorrow at noon"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Resolve the text but don't create the event
        #[arg(long)]
        dry_run: bool,

        /// Print protocol response objects instead of messages
        #[arg(long)]
        json: bool,
    },

    /// Resolve a description and print the structured event
    Parse {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Also print the absolute start/end sent to the calendar
        #[arg(long)]
        descriptor: bool,
    },

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Serve the browser extension over native messaging (stdin/stdout)
    Host,
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// Origin prefixes browsers pass as the first argument when launching a
/// native-messaging host.
const EXTENSION_ORIGINS: [&str; 2] = ["chrome-extension://", "moz-extension://"];

/// Maps a browser launch onto `quickcal host`.
///
/// Browsers start the host binary with the calling extension's origin
/// instead of a subcommand; everything else passes through unchanged.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    let launched_by_browser = args.get(1).and_then(|arg| arg.to_str()).is_some_and(|arg| {
        EXTENSION_ORIGINS
            .iter()
            .any(|origin| arg.starts_with(origin))
    });
    if launched_by_browser {
        args.truncate(1);
        args.push(OsString::from("host"));
    }
    args
}

/// Joins positional words back into the text the user typed.
pub fn join_text(words: &[String]) -> String {
    words.join(" ")
}
