use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::record::{history_id, Record};

/// Append-only per-chart record history, one JSON array file per chart.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", history_id(hash)))
    }

    pub fn append(&self, record: &Record) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create records dir: {}", self.dir.display()))?;

        let path = self.path_for(&record.hash);
        let mut records = self.load(&record.hash)?;
        records.push(record.clone());

        let json = serde_json::to_string_pretty(&records).context("failed to serialize records")?;
        fs::write(&path, json).with_context(|| format!("failed to write: {}", path.display()))?;
        log::info!(
            "appended record for {:?} ({} total) to {}",
            record.hash,
            records.len(),
            path.display()
        );
        Ok(())
    }

    /// Records in the order they were appended. A chart with no history yields an empty list.
    pub fn load(&self, hash: &str) -> anyhow::Result<Vec<Record>> {
        let path = self.path_for(hash);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read records: {}", path.display()))?;
        let records: Vec<Record> = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse records json: {}", path.display()))?;
        Ok(records)
    }

    /// Records sorted by score, best first. Equal scores keep append order.
    pub fn ranked(&self, hash: &str) -> anyhow::Result<Vec<Record>> {
        let mut records = self.load(hash)?;
        records.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(records)
    }

    pub fn best(&self, hash: &str) -> anyhow::Result<Option<Record>> {
        Ok(self.ranked(hash)?.into_iter().next())
    }
}
