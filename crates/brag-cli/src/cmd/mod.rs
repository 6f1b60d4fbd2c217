pub mod accept;
pub mod config;
pub mod entry;
pub mod generate;
pub mod init;
pub mod ledger;
pub mod review;
pub mod serve;
pub mod show;
pub mod task;

use anyhow::Context;
use brag_core::config::BragConfig;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::path::Path;

/// Load the project config, failing with a hint when `brag init` has not run.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<BragConfig> {
    BragConfig::load(root).with_context(|| {
        format!(
            "failed to load config under {} (run `brag init` first)",
            root.display()
        )
    })
}

/// Parse `--since`: `YYYY-MM-DD`, an RFC 3339 timestamp, or `<N>d` for N days ago.
pub(crate) fn parse_since(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Some(days) = s.strip_suffix('d').and_then(|d| d.parse::<i64>().ok()) {
        if !(0..=36_500).contains(&days) {
            anyhow::bail!("--since {s}: day count out of range");
        }
        return Ok(Utc::now() - Duration::days(days));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid --since '{s}'; expected YYYY-MM-DD, RFC 3339, or <N>d"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid --since '{s}'"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
