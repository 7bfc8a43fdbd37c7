//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "defaultUser": "maria" },
//!   "matching": { "tolerancePercent": 1, "maxCandidates": 5, "autoMatchDays": 3 }
//! }
//! ```
//! Sections and keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result as CoreResult};

/// Environment variable naming the acting user
pub const USER_ENV: &str = "BANKREC_USER";

const FALLBACK_USER: &str = "system";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    matching: MatchingSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_user: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Matching heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingSettings {
    /// Half-width of the amount window, in percent of the transaction amount
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: Decimal,
    /// Candidates returned per suggestion
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Due-date slack, in days, for the second auto-reconcile pass
    #[serde(default = "default_auto_match_days")]
    pub auto_match_days: i64,
}

fn default_tolerance_percent() -> Decimal {
    Decimal::ONE
}

fn default_max_candidates() -> usize {
    5
}

fn default_auto_match_days() -> i64 {
    3
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            tolerance_percent: default_tolerance_percent(),
            max_candidates: default_max_candidates(),
            auto_match_days: default_auto_match_days(),
        }
    }
}

impl MatchingSettings {
    /// Reject values the matcher cannot work with
    pub fn validate(&self) -> CoreResult<()> {
        if self.tolerance_percent < Decimal::ZERO || self.tolerance_percent >= Decimal::ONE_HUNDRED
        {
            return Err(Error::config(format!(
                "matching.tolerancePercent must be in [0, 100), got {}",
                self.tolerance_percent
            )));
        }
        if self.max_candidates == 0 {
            return Err(Error::config("matching.maxCandidates must be at least 1"));
        }
        if self.auto_match_days < 0 {
            return Err(Error::config("matching.autoMatchDays cannot be negative"));
        }
        Ok(())
    }
}

/// Engine configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub matching: MatchingSettings,
    pub default_user: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields defaults; out-of-range values are
    /// rejected.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        raw.matching.validate()?;

        Ok(Self {
            matching: raw.matching.clone(),
            default_user: raw.app.default_user.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory, preserving fields this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.matching.validate()?;
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.matching = self.matching.clone();
        settings.app.default_user = self.default_user.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// User recorded on imports and reconciliations
    ///
    /// `BANKREC_USER` wins over `app.defaultUser`; without either, "system".
    pub fn acting_user(&self) -> String {
        resolve_user(std::env::var(USER_ENV).ok(), self.default_user.as_deref())
    }
}

fn resolve_user(env_user: Option<String>, default_user: Option<&str>) -> String {
    env_user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| {
            default_user
                .filter(|u| !u.trim().is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_USER.to_string())
}
