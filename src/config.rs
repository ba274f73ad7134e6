//! Configuration loading from `.env` files.

use std::{env, path::Path};

use anyhow::{Context, Result};

/// Runtime settings derived from environment variables. Every setting is
/// optional; command-line flags take precedence over all of them.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Author public key used when flattening without a signing key.
    pub pubkey: Option<String>,
    /// Signing key (hex or nsec) applied unless `--unsigned` is given.
    pub secret_key: Option<String>,
    /// Relay hints emitted as `r` tags.
    pub relays: Vec<String>,
    /// Default language for rebuilt JSON-LD contexts.
    pub language: Option<String>,
}

impl Settings {
    /// Load settings from the specified `.env` file. A missing file yields
    /// empty settings; the converter has no state worth creating one for.
    pub fn from_env(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path).context("reading env file")?;
        }
        let pubkey = env::var("AMBR_PUBKEY").ok().filter(|s| !s.is_empty());
        let secret_key = env::var("AMBR_SECRET_KEY").ok().filter(|s| !s.is_empty());
        let relays = csv_strings(env::var("AMBR_RELAYS").unwrap_or_default());
        let language = env::var("AMBR_LANGUAGE").ok().filter(|s| !s.is_empty());
        Ok(Self {
            pubkey,
            secret_key,
            relays,
            language,
        })
    }
}

/// Split a comma-separated string into trimmed string values.
pub fn csv_strings(input: impl AsRef<str>) -> Vec<String> {
    let s = input.as_ref();
    s.split(',')
        .filter_map(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .collect()
}
