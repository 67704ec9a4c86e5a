// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod kv;

pub use kv::{KeyValue, MemoryKv, SqliteKv, validate_db_path};

use anyhow::{Context, Result, anyhow, bail};
use flota_app::Document;
use flota_sync::{Client, PushQueue, SyncError, SyncResult};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const APP_NAME: &str = "flota";
pub const DOCUMENT_KEY: &str = "mantenimientos_db";
pub const LAST_SYNC_KEY: &str = "lastSyncSuccess";

/// What an empty store is filled with on first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    #[default]
    Demo,
    Blank,
}

impl Seed {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Blank => "blank",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "demo" => Some(Self::Demo),
            "blank" => Some(Self::Blank),
            _ => None,
        }
    }

    pub fn document(self) -> Document {
        match self {
            Self::Demo => Document::initial(),
            Self::Blank => Document::blank(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Merged { document: Document, changed: bool },
    /// The local document is untouched.
    Failed { error: SyncError, local: Document },
}

pub struct Store {
    kv: Box<dyn KeyValue>,
    seed: Seed,
    pusher: Option<PushQueue>,
}

impl Store {
    pub fn open(path: &Path, seed: Seed) -> Result<Self> {
        Ok(Self::with_backend(Box::new(SqliteKv::open(path)?), seed))
    }

    pub fn open_memory(seed: Seed) -> Self {
        Self::with_backend(Box::new(MemoryKv::new()), seed)
    }

    pub fn with_backend(kv: Box<dyn KeyValue>, seed: Seed) -> Self {
        Self {
            kv,
            seed,
            pusher: None,
        }
    }

    /// Saves made while a queue is attached also push to the configured sync URL.
    pub fn attach_pusher(&mut self, queue: PushQueue) {
        self.pusher = Some(queue);
    }

    pub fn detach_pusher(&mut self) -> Option<PushQueue> {
        self.pusher.take()
    }

    pub fn load(&mut self) -> Result<Document> {
        let Some(raw) = self.kv.get(DOCUMENT_KEY)? else {
            let document = self.seed.document();
            log::info!("no stored document; seeding {} data", self.seed.as_str());
            self.persist(&document)?;
            return Ok(document);
        };

        let value = serde_json::from_str::<Value>(&raw).with_context(|| {
            format!("stored document under {DOCUMENT_KEY} is not JSON -- run `flota reset` or `flota clear` to start over")
        })?;
        let missing = missing_top_level_keys(&value);
        let document = serde_json::from_value::<Document>(value).with_context(|| {
            format!("stored document under {DOCUMENT_KEY} does not decode -- run `flota check` for details or `flota reset`")
        })?;
        if !missing.is_empty() {
            log::info!("backfilling missing keys: {}", missing.join(", "));
            self.persist(&document)?;
        }
        Ok(document)
    }

    pub fn save(&mut self, document: &Document) -> Result<()> {
        self.persist(document)?;
        if let (Some(url), Some(pusher)) = (document.report_settings.sync_url(), &self.pusher) {
            pusher.enqueue(url, document);
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<Document> {
        let document = Document::initial();
        self.persist(&document)?;
        Ok(document)
    }

    pub fn clear(&mut self) -> Result<Document> {
        let document = Document::blank();
        self.persist(&document)?;
        Ok(document)
    }

    /// Fetch the remote document and merge it over the local one. Storage failures are
    /// errors; sync failures are a `Failed` outcome that leaves the local document alone.
    pub fn pull_remote(&mut self, client: &Client) -> Result<PullOutcome> {
        let local = self.load()?;
        let Some(url) = local.report_settings.sync_url().map(str::to_owned) else {
            return Ok(PullOutcome::Failed {
                error: SyncError::NotConfigured,
                local,
            });
        };

        let merged = match client
            .fetch_document(&url)
            .and_then(|remote| merge_remote(&local, remote))
        {
            Ok(merged) => merged,
            Err(error) => {
                log::warn!("pull failed: {error}");
                return Ok(PullOutcome::Failed { error, local });
            }
        };

        let changed = fingerprint(&merged)? != fingerprint(&local)?;
        self.persist(&merged)?;
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        self.kv.put(LAST_SYNC_KEY, &millis.to_string())?;
        log::info!(
            "pulled document from sync endpoint ({})",
            if changed { "changed" } else { "unchanged" }
        );
        Ok(PullOutcome::Merged {
            document: merged,
            changed,
        })
    }

    /// Post the stored document synchronously.
    pub fn push_remote(&mut self, client: &Client) -> Result<SyncResult<()>> {
        let document = self.load()?;
        let result = document
            .report_settings
            .sync_url()
            .ok_or(SyncError::NotConfigured)
            .and_then(|url| client.post_document(url, &document));
        match &result {
            Ok(()) => log::info!("pushed document to sync endpoint"),
            Err(error) => log::warn!("push failed: {error}"),
        }
        Ok(result)
    }

    /// Store the URL without pushing, then pull what the endpoint holds.
    pub fn link_device(&mut self, url: &str, client: &Client) -> Result<PullOutcome> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            bail!("sync URL must not be empty -- pass the deployed script URL");
        }
        let document = self.load()?.with_sync_url(trimmed);
        self.persist(&document)?;
        log::info!("linked device to {trimmed}");
        self.pull_remote(client)
    }

    /// Epoch millis of the last successful pull.
    pub fn last_sync_success(&self) -> Result<Option<i64>> {
        let Some(raw) = self.kv.get(LAST_SYNC_KEY)? else {
            return Ok(None);
        };
        raw.trim()
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("{LAST_SYNC_KEY} holds {raw:?}, expected epoch millis"))
    }

    fn persist(&mut self, document: &Document) -> Result<()> {
        let raw = serde_json::to_string(document).context("encode document")?;
        self.kv.put(DOCUMENT_KEY, &raw)?;
        let revision = fingerprint(document)?;
        log::debug!("saved document rev {}", &revision[..12]);
        Ok(())
    }
}

/// Shallow merge: every top-level key the remote carries replaces the local one. The
/// local sync URL always survives.
pub fn merge_remote(local: &Document, remote: Map<String, Value>) -> SyncResult<Document> {
    let mut merged = match serde_json::to_value(local) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Map::new(),
    };
    for (key, value) in remote {
        merged.insert(key, value);
    }

    let document = serde_json::from_value::<Document>(Value::Object(merged)).map_err(|error| {
        SyncError::InvalidStructure {
            detail: error.to_string(),
        }
    })?;
    let url = local.report_settings.google_script_url.trim();
    Ok(document.with_sync_url(url))
}

/// Hex SHA-256 of the canonical JSON encoding.
pub fn fingerprint(document: &Document) -> Result<String> {
    let raw = serde_json::to_vec(document).context("encode document")?;
    let digest = Sha256::digest(&raw);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    Ok(output)
}

fn missing_top_level_keys(value: &Value) -> Vec<&'static str> {
    let Some(map) = value.as_object() else {
        return Document::TOP_LEVEL_KEYS.to_vec();
    };
    Document::TOP_LEVEL_KEYS
        .into_iter()
        .filter(|key| !map.contains_key(*key))
        .collect()
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("FLOTA_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set FLOTA_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("flota.db"))
}
