// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order, later wins: compiled defaults, `/etc/framegrid/framegrid.toml`,
//! `$XDG_CONFIG/framegrid/framegrid.toml`, `./framegrid.toml`, then
//! `FRAMEGRID_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FramegridConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/framegrid/framegrid.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "framegrid.toml";

/// Sections that env var keys are split on, in match order.
const ENV_SECTIONS: &[&str] = &[
    "agent", "telegram", "storage", "grid", "transfer", "ingest", "queue", "archive",
];

/// The user-level config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("framegrid").join(LOCAL_CONFIG_FILE))
}

/// Builds the full layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FramegridConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<FramegridConfig, figment::Error> {
    build_figment().extract()
}

/// Loads defaults overlaid with one explicit file and env overrides.
pub fn load_config_from_path(path: &Path) -> Result<FramegridConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FramegridConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Loads defaults overlaid with an inline TOML document. Env is ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<FramegridConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FramegridConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `FRAMEGRID_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`: only the
/// first underscore after a known section name becomes a dot.
fn env_provider() -> Env {
    Env::prefixed("FRAMEGRID_").map(|key| map_env_key(key.as_str()).into())
}

/// `key` arrives with the prefix stripped but in its original case.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("transfer_chunk_size"), "transfer.chunk_size");
        assert_eq!(
            map_env_key("queue_empty_queue_shutdown_secs"),
            "queue.empty_queue_shutdown_secs"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_keys_are_lowercased_before_mapping() {
        assert_eq!(map_env_key("TELEGRAM_BOT_TOKEN"), "telegram.bot_token");
        assert_eq!(map_env_key("GRID_ROWS"), "grid.rows");
        assert_eq!(map_env_key("Queue_Max_Retries"), "queue.max_retries");
    }

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str("[queue]\nmax_retries = 2\n").unwrap();
        assert_eq!(config.queue.max_retries, 2);
        assert_eq!(config.queue.stale_after_secs, 3600);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Figment::new()
            .merge(Serialized::defaults(FramegridConfig::default()))
            .merge(Toml::file("/nonexistent/framegrid.toml"))
            .extract::<FramegridConfig>()
            .unwrap();
        assert_eq!(config.grid.rows, 3);
    }
}
