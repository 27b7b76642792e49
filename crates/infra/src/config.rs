//! Engine configuration.
//!
//! Defaults are usable as-is; `EngineConfig::from_env` overlays `DOCFLOW_*`
//! environment variables on top of them.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use docflow_core::DocumentKind;

/// Document number formatting and allocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub quote_prefix: String,
    pub invoice_prefix: String,
    pub delivery_note_prefix: String,
    pub job_card_prefix: String,
    /// Minimum number of digits; numbers are zero-padded up to this width.
    pub width: usize,
    /// How many times creation retries after a duplicate-number rejection.
    pub max_attempts: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            quote_prefix: "Q".to_string(),
            invoice_prefix: "INV".to_string(),
            delivery_note_prefix: "DN".to_string(),
            job_card_prefix: "JC".to_string(),
            width: 4,
            max_attempts: 5,
        }
    }
}

impl NumberingConfig {
    pub fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Quote => &self.quote_prefix,
            DocumentKind::Invoice => &self.invoice_prefix,
            DocumentKind::DeliveryNote => &self.delivery_note_prefix,
            DocumentKind::JobCard => &self.job_card_prefix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub numbering: NumberingConfig,
    /// Automatic retries after a stale-write conflict.
    pub conflict_retries: u32,
    pub invoice_due_days: u32,
    pub quote_validity_days: u32,
    pub scheduler_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingConfig::default(),
            conflict_retries: 1,
            invoice_due_days: 30,
            quote_validity_days: 30,
            scheduler_poll_interval_ms: 60_000,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `DOCFLOW_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let n = defaults.numbering;

        Self {
            numbering: NumberingConfig {
                quote_prefix: lookup("DOCFLOW_QUOTE_PREFIX").unwrap_or(n.quote_prefix),
                invoice_prefix: lookup("DOCFLOW_INVOICE_PREFIX").unwrap_or(n.invoice_prefix),
                delivery_note_prefix: lookup("DOCFLOW_DELIVERY_NOTE_PREFIX")
                    .unwrap_or(n.delivery_note_prefix),
                job_card_prefix: lookup("DOCFLOW_JOB_CARD_PREFIX").unwrap_or(n.job_card_prefix),
                width: parsed(&lookup, "DOCFLOW_NUMBER_WIDTH", n.width),
                max_attempts: parsed(&lookup, "DOCFLOW_NUMBERING_MAX_ATTEMPTS", n.max_attempts),
            },
            conflict_retries: parsed(&lookup, "DOCFLOW_CONFLICT_RETRIES", defaults.conflict_retries),
            invoice_due_days: parsed(&lookup, "DOCFLOW_INVOICE_DUE_DAYS", defaults.invoice_due_days),
            quote_validity_days: parsed(
                &lookup,
                "DOCFLOW_QUOTE_VALIDITY_DAYS",
                defaults.quote_validity_days,
            ),
            scheduler_poll_interval_ms: parsed(
                &lookup,
                "DOCFLOW_SCHEDULER_POLL_INTERVAL_MS",
                defaults.scheduler_poll_interval_ms,
            ),
        }
    }

    pub fn scheduler_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_poll_interval_ms)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, fallback = %default, "invalid config value; using default");
                default
            }
        },
    }
}
