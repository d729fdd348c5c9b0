//! Command-line and file configuration.
//!
//! Settings come from three layers, highest priority first: command-line
//! flags (or their `MEMEFEED_*` environment variables), an optional JSON
//! config file given with `--config`, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::feed::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Rows below the visible window at which the next page is requested.
pub const DEFAULT_TRIGGER_MARGIN: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "memefeed", version, about = "Scroll the community meme feed in your terminal")]
pub struct Cli {
    /// Base URL of the meme service
    #[arg(long, env = "MEMEFEED_API_URL")]
    pub api_url: Option<String>,

    /// Sign in with an existing token instead of email/password
    #[arg(long, env = "MEMEFEED_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Email to sign in with
    #[arg(long, env = "MEMEFEED_EMAIL")]
    pub email: Option<String>,

    /// Password to sign in with
    #[arg(long, env = "MEMEFEED_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Posts requested per page
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Rows before the end of the list at which the next page loads
    #[arg(long)]
    pub trigger_margin: Option<usize>,

    /// Write logs to this file (the terminal is busy drawing the feed)
    #[arg(long, env = "MEMEFEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Contents of the `--config` file.  Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub page_size: Option<u32>,
    pub trigger_margin: Option<usize>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

/// How to establish the viewer at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    Token(String),
    Password { email: String, password: String },
    /// Start signed out.
    Anonymous,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub sign_in: SignIn,
    pub page_size: u32,
    pub trigger_margin: usize,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Resolve the command line, reading the config file if one was given.
    pub fn load(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    /// Layer `cli` over `file` over the defaults.
    pub fn merge(cli: Cli, file: FileConfig) -> Result<Self> {
        let token = cli.token.or(file.token);
        let email = cli.email.or(file.email);
        let password = cli.password.or(file.password);

        let sign_in = match (token, email, password) {
            (Some(token), _, _) => SignIn::Token(token),
            (None, Some(email), Some(password)) => SignIn::Password { email, password },
            (None, Some(_), None) => anyhow::bail!("an email was given without a password"),
            (None, None, _) => SignIn::Anonymous,
        };

        let page_size = cli.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        anyhow::ensure!(page_size > 0, "page size must be at least 1");

        Ok(Self {
            api_url: cli
                .api_url
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            sign_in,
            page_size,
            trigger_margin: cli
                .trigger_margin
                .or(file.trigger_margin)
                .unwrap_or(DEFAULT_TRIGGER_MARGIN),
            log_file: cli.log_file.or(file.log_file),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("memefeed").chain(args.iter().copied())).unwrap()
    }

    fn file(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_when_nothing_is_given() {
        let config = Config::merge(cli(&[]), FileConfig::default()).unwrap();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.sign_in, SignIn::Anonymous);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.trigger_margin, DEFAULT_TRIGGER_MARGIN);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn file_values_fill_in_for_missing_flags() {
        let config = Config::merge(
            cli(&["--page-size", "5"]),
            file(r#"{ "apiUrl": "https://memes.example", "pageSize": 20, "triggerMargin": 1 }"#),
        )
        .unwrap();

        assert_eq!(config.api_url, "https://memes.example");
        assert_eq!(config.page_size, 5, "flag beats file");
        assert_eq!(config.trigger_margin, 1);
    }

    #[test]
    fn token_takes_priority_over_password() {
        let config = Config::merge(
            cli(&["--token", "abc"]),
            file(r#"{ "email": "a@example.com", "password": "pw" }"#),
        )
        .unwrap();
        assert_eq!(config.sign_in, SignIn::Token("abc".into()));
    }

    #[test]
    fn email_and_password_may_come_from_different_layers() {
        let config = Config::merge(
            cli(&["--email", "a@example.com"]),
            file(r#"{ "password": "pw" }"#),
        )
        .unwrap();
        assert_eq!(
            config.sign_in,
            SignIn::Password {
                email: "a@example.com".into(),
                password: "pw".into()
            }
        );
    }

    #[test]
    fn email_without_password_is_rejected() {
        assert!(Config::merge(cli(&["--email", "a@example.com"]), FileConfig::default()).is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(Cli::try_parse_from(["memefeed", "--page-size", "0"]).is_err());
        assert!(Config::merge(cli(&[]), file(r#"{ "pageSize": 0 }"#)).is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(serde_json::from_str::<FileConfig>(r#"{ "theme": "dark" }"#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FileConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
