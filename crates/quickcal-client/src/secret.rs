//! Secret references in `config.toml`.
//!
//! Credential values may point outside the file:
//!
//! - `pass::path/in/store` - first line of `pass show path/in/store`
//! - `env::VAR_NAME` - value of `$VAR_NAME`
//! - anything else - used verbatim

use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),

    #[error("failed to run `pass show {path}`: {source}")]
    PassSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`pass show {path}` failed: {stderr}")]
    PassFailed { path: String, stderr: String },

    #[error("`pass show {0}` produced no output")]
    PassEmpty(String),
}

/// A parsed secret reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Pass(&'a str),
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Whether the value lives outside `config.toml`.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    pub fn resolve(self) -> Result<String, SecretError> {
        match self {
            Self::Pass(path) => resolve_pass(path),
            Self::Env(var) => std::env::var(var).map_err(|_| SecretError::MissingEnv(var.to_string())),
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves a possibly-referenced value.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    SecretRef::parse(value).resolve()
}

fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|source| SecretError::PassSpawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::PassFailed {
            path: path.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SecretError::PassEmpty(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixes() {
        assert_eq!(SecretRef::parse("pass::openai/key"), SecretRef::Pass("openai/key"));
        assert_eq!(SecretRef::parse("env::OPENAI_API_KEY"), SecretRef::Env("OPENAI_API_KEY"));
        assert_eq!(SecretRef::parse("sk-123"), SecretRef::Plain("sk-123"));
        assert!(!SecretRef::parse("sk-123").is_reference());
        assert!(SecretRef::parse("env::X").is_reference());
    }

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("sk-plain").unwrap(), "sk-plain");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_QUICKCAL_TEST_SECRET", "from-env");
        }
        assert_eq!(resolve("env::_QUICKCAL_TEST_SECRET").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_QUICKCAL_TEST_SECRET");
        }
    }

    #[test]
    fn env_reference_missing() {
        let err = resolve("env::_QUICKCAL_UNSET_VAR_98765").unwrap_err();
        assert!(matches!(err, SecretError::MissingEnv(_)));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn pass_reference_failure() {
        // fails whether or not `pass` is installed
        assert!(resolve("pass::quickcal/does/not/exist/12345").is_err());
    }
}
