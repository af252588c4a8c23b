use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "https://chaos.aa.net.uk";

/// Everything the store and fetcher need, resolved once at startup and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) db_path: PathBuf,
    pub(crate) auth_path: PathBuf,
    pub(crate) base_url: String,
    /// Day of the month the ISP's billing cycle starts on.
    pub(crate) cycle_start_day: u32,
    /// Minimum age of the newest reading before `update` will hit the API
    /// again.
    pub(crate) min_fetch_interval: chrono::Duration,
}

impl Config {
    pub(crate) fn load() -> Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("uk", "netquota", "netquota")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        let db_path = match std::env::var_os("NETQUOTA_DB") {
            Some(path) => PathBuf::from(path),
            None => {
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("store.db")
            }
        };

        let auth_path = match std::env::var_os("NETQUOTA_AUTH") {
            Some(path) => PathBuf::from(path),
            None => proj_dirs.config_dir().join("auth"),
        };

        let base_url =
            std::env::var("NETQUOTA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        // Most accounts reset on the 1st; accounts on a different billing
        // cycle set NETQUOTA_CYCLE_DAY.
        let cycle_start_day = match std::env::var("NETQUOTA_CYCLE_DAY") {
            Ok(s) => s
                .parse()
                .with_context(|| format!("NETQUOTA_CYCLE_DAY is not a day of month: {s:?}"))?,
            Err(_) => 1,
        };

        Ok(Self {
            db_path,
            auth_path,
            base_url,
            cycle_start_day,
            min_fetch_interval: chrono::Duration::hours(3),
        })
    }
}
