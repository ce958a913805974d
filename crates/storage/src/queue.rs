//! The delimited execution queue the trading terminal drains.
//!
//! Write-once per oid: redelivered messages must never produce a second row,
//! so every append scans for the oid first. The terminal deletes rows by oid
//! once executed; compensation removes rows the store failed to confirm.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use common::models::QueueRow;
use tracing::debug;

use crate::error::QueueError;

pub struct ExecutionQueue {
    path: PathBuf,
}

impl ExecutionQueue {
    pub fn new(dir: &Path, filename: &str) -> Result<Self, QueueError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(filename),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, oid: &str) -> Result<bool, QueueError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        for record in reader.records() {
            if record?.get(0) == Some(oid) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Scan-before-append: returns false without writing when a row with this
    /// oid already exists (an EDIT redelivery, typically).
    pub fn append_if_absent(&self, row: &QueueRow) -> Result<bool, QueueError> {
        if self.contains(&row.oid)? {
            debug!("queue row {} already present, skipping append", row.oid);
            return Ok(false);
        }
        let existed = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!existed)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(true)
    }

    /// Removes the row for `oid`, rewriting the file. Used by compensation
    /// when the relational commit fails after a successful append.
    pub fn remove(&self, oid: &str) -> Result<bool, QueueError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let mut kept = Vec::new();
        let mut removed = false;
        for record in reader.records() {
            let record = record?;
            if record.get(0) == Some(oid) {
                removed = true;
            } else {
                kept.push(record);
            }
        }
        if !removed {
            return Ok(false);
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(&headers)?;
        for record in kept {
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(true)
    }

    pub fn rows(&self) -> Result<Vec<QueueRow>, QueueError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }
}
