// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use flota_db::Seed;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const CONFIG_ENV: &str = "FLOTA_CONFIG_PATH";
const DEFAULT_LOG_FILTER: &str = "info";

/// Accepted duration suffixes, longest first so `ms` wins over `m`.
const DURATION_UNITS: [(&str, u64); 4] =
    [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

/// On-disk shape. Every section is optional; `version` is checked before anything else.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: Option<i64>,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    sync: SyncSection,
    #[serde(default)]
    report: ReportSection,
    #[serde(default)]
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageSection {
    db_path: Option<String>,
    seed: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncSection {
    timeout: String,
    pull_interval: String,
    check_interval: String,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            timeout: "10s".to_owned(),
            pull_interval: "5m".to_owned(),
            check_interval: "1m".to_owned(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportSection {
    app_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    filter: Option<String>,
}

/// Resolved settings with durations already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    db_path: Option<PathBuf>,
    seed: Seed,
    sync_timeout: Duration,
    pull_interval: Duration,
    check_interval: Duration,
    app_url: String,
    log_filter: String,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dir = dirs::config_dir()
            .map(|root| root.join(flota_db::APP_NAME))
            .ok_or_else(|| anyhow!("no config directory on this platform; set {CONFIG_ENV}"))?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("create config directory {}", dir.display()))?;
        Ok(dir.join("config.toml"))
    }

    /// A missing file means defaults; a present one must declare `version = 1`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::resolve(ConfigFile::default(), path);
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&text)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        match file.version {
            None => bail!(
                "config {} has no version -- add `version = 1` at the top, with settings under [storage], [sync], [report], and [log]",
                path.display()
            ),
            Some(CONFIG_VERSION) => Self::resolve(file, path),
            Some(other) => bail!(
                "config {} declares version {other}; this build reads version = {CONFIG_VERSION}",
                path.display()
            ),
        }
    }

    fn resolve(file: ConfigFile, path: &Path) -> Result<Self> {
        let db_path = match file.storage.db_path {
            Some(raw) => {
                flota_db::validate_db_path(&raw)
                    .with_context(|| format!("[storage].db_path in {}", path.display()))?;
                Some(PathBuf::from(raw))
            }
            None => None,
        };

        let seed = match file.storage.seed.as_deref() {
            None => Seed::default(),
            Some(raw) => Seed::parse(raw).ok_or_else(|| {
                anyhow!(
                    "[storage].seed in {} is {raw:?} -- use \"demo\" or \"blank\"",
                    path.display()
                )
            })?,
        };

        let interval = |key: &str, raw: &str| -> Result<Duration> {
            let parsed = parse_duration(raw)
                .with_context(|| format!("[sync].{key} in {}", path.display()))?;
            if parsed.is_zero() {
                bail!("[sync].{key} in {} must be greater than zero", path.display());
            }
            Ok(parsed)
        };

        Ok(Self {
            db_path,
            seed,
            sync_timeout: interval("timeout", &file.sync.timeout)?,
            pull_interval: interval("pull_interval", &file.sync.pull_interval)?,
            check_interval: interval("check_interval", &file.sync.check_interval)?,
            app_url: file.report.app_url.unwrap_or_default().trim().to_owned(),
            log_filter: file
                .log
                .filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
        })
    }

    /// `[storage].db_path`, then `FLOTA_DB_PATH`, then the platform data directory.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => flota_db::default_db_path(),
        }
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    pub fn pull_interval(&self) -> Duration {
        self.pull_interval
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn example_config(path: &Path) -> String {
        let sync = SyncSection::default();
        format!(
            r#"# flota configuration ({path})

version = 1

[storage]
# Defaults to the platform data directory, or FLOTA_DB_PATH when set.
# db_path = "/var/lib/flota/flota.db"
# Contents of a brand-new database: "demo" or "blank".
seed = "demo"

[sync]
timeout = "{timeout}"
pull_interval = "{pull}"
check_interval = "{check}"

[report]
# Appended to mailto bodies.
app_url = ""

[log]
# RUST_LOG takes precedence.
filter = "{filter}"
"#,
            path = path.display(),
            timeout = sync.timeout,
            pull = sync.pull_interval,
            check = sync.check_interval,
            filter = DEFAULT_LOG_FILTER,
        )
    }
}

/// `<N>ms`, `<N>s`, `<N>m` or `<N>h`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let trimmed = raw.trim();
    for (suffix, millis_per_unit) in DURATION_UNITS {
        let Some(amount) = trimmed.strip_suffix(suffix) else {
            continue;
        };
        if amount.is_empty() || !amount.bytes().all(|byte| byte.is_ascii_digit()) {
            break;
        }
        let amount: u64 = amount
            .parse()
            .with_context(|| format!("duration {raw:?} is out of range"))?;
        let millis = amount
            .checked_mul(millis_per_unit)
            .ok_or_else(|| anyhow!("duration {raw:?} is out of range"))?;
        return Ok(Duration::from_millis(millis));
    }
    bail!("cannot read duration {raw:?} -- write a whole number with ms, s, m or h, like 30s or 5m")
}
