//! Soot configuration.
//!
//! Settings are layered from `~/.config/soot/config.toml` and `SOOT_*`
//! environment variables (e.g. `SOOT_DATABASE_URL`, `SOOT_BIND`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{SootError, SootResult};
use crate::occurrence::LeapDayPolicy;

static DEFAULT_DATABASE_URL: &str = "sqlite://~/.local/share/soot/soot.sqlite3";
static DEFAULT_BIND: &str = "127.0.0.1:4096";

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_public_url() -> String {
    format!("http://{}", DEFAULT_BIND)
}

fn default_session_ttl_days() -> i64 {
    30
}

fn default_feed_past_days() -> i64 {
    30
}

fn default_feed_future_days() -> i64 {
    365
}

fn default_image_job_ttl_minutes() -> i64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SootConfig {
    /// sqlx connection string; `~` is expanded.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Base URL used when handing out calendar feed links.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,

    #[serde(default = "default_feed_past_days")]
    pub feed_past_days: i64,

    #[serde(default = "default_feed_future_days")]
    pub feed_future_days: i64,

    /// A pending image job older than this is considered abandoned.
    #[serde(default = "default_image_job_ttl_minutes")]
    pub image_job_ttl_minutes: i64,

    #[serde(default)]
    pub leap_day_policy: LeapDayPolicy,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for SootConfig {
    fn default() -> Self {
        SootConfig {
            database_url: default_database_url(),
            bind: default_bind(),
            public_url: default_public_url(),
            session_ttl_days: default_session_ttl_days(),
            feed_past_days: default_feed_past_days(),
            feed_future_days: default_feed_future_days(),
            image_job_ttl_minutes: default_image_job_ttl_minutes(),
            leap_day_policy: LeapDayPolicy::default(),
            log_json: false,
        }
    }
}

impl SootConfig {
    pub fn config_path() -> SootResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SootError::Config("Impossible de déterminer le dossier de configuration".into()))?
            .join("soot");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, creating a commented-out
    /// file on first run.
    pub fn load() -> SootResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> SootResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("SOOT"))
            .build()
            .map_err(|e| SootError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SootError::Config(e.to_string()))
    }

    /// Connection string with `~` expanded.
    pub fn expanded_database_url(&self) -> String {
        match self.database_url.strip_prefix("sqlite://") {
            Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
            None => self.database_url.clone(),
        }
    }

    /// Public feed link for a token.
    pub fn feed_url(&self, token: &str) -> String {
        format!(
            "{}/calendar/feed?token={}",
            self.public_url.trim_end_matches('/'),
            token
        )
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SootResult<()> {
        let contents = format!(
            "\
# soot configuration

# Where the database lives:
# database_url = \"{}\"

# Address the HTTP server listens on:
# bind = \"{}\"

# How long issued sessions stay valid:
# session_ttl_days = 30

# Window exported by the calendar feed, relative to today:
# feed_past_days = 30
# feed_future_days = 365

# Pending image jobs older than this are treated as abandoned:
# image_job_ttl_minutes = 15

# What a Feb 29 yearly date does in a non-leap year (skip, feb28, mar1):
# leap_day_policy = \"feb28\"
",
            DEFAULT_DATABASE_URL, DEFAULT_BIND
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SootError::Config(format!("Impossible de créer le dossier de configuration : {e}"))
            })?;
        }

        std::fs::write(path, contents).map_err(|e| {
            SootError::Config(format!("Impossible d'écrire le fichier de configuration : {e}"))
        })?;

        Ok(())
    }
}
