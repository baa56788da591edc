// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable activity archive, persisted as one JSON snapshot file.
//!
//! The archive is the only durable state in the pipeline. Every sync merges
//! into it by activity ID (last write wins), imports replace it wholesale,
//! and a reset removes it. All read-modify-write cycles run to completion
//! under an internal lock, so concurrent requests cannot interleave a merge.

use crate::error::{AppError, Result};
use crate::models::Activity;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Local activity archive backed by a JSON snapshot file.
pub struct ActivityArchive {
    path: PathBuf,
    /// Serializes read-modify-write cycles; a single writer at a time.
    write_lock: Mutex<()>,
}

/// Result of merging a batch into the archive.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MergeStats {
    /// Archive size after the merge
    pub total: usize,
    /// Activities not previously archived
    pub inserted: usize,
    /// Activities that overwrote an existing record
    pub updated: usize,
}

impl ActivityArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot.
    ///
    /// An absent file means no archive yet. An unparsable file is treated as
    /// an empty archive rather than a fatal error, so a corrupt snapshot
    /// cannot take the whole system down at startup.
    pub async fn load(&self) -> Result<Vec<Activity>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(activities) => Ok(activities),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %self.path.display(),
                        "Archive snapshot is corrupt, treating as empty"
                    );
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }

    /// Merge a batch into the archive by activity ID and persist the result.
    ///
    /// Last write wins on a matching ID; existing archive order is kept and
    /// newly seen activities append in arrival order. Merging the same batch
    /// twice leaves the archive identical to merging it once.
    pub async fn merge_and_persist(&self, batch: &[Activity]) -> Result<MergeStats> {
        let _guard = self.write_lock.lock().await;

        let mut merged = self.load().await?;
        let mut by_id: HashMap<u64, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id, i))
            .collect();

        let mut inserted = 0;
        let mut updated = 0;
        for activity in batch {
            match by_id.get(&activity.id) {
                Some(&i) => {
                    merged[i] = activity.clone();
                    updated += 1;
                }
                None => {
                    by_id.insert(activity.id, merged.len());
                    merged.push(activity.clone());
                    inserted += 1;
                }
            }
        }

        self.persist(&merged).await?;

        let stats = MergeStats {
            total: merged.len(),
            inserted,
            updated,
        };
        tracing::info!(
            total = stats.total,
            inserted = stats.inserted,
            updated = stats.updated,
            "Archived activity batch"
        );
        Ok(stats)
    }

    /// Overwrite the snapshot wholesale. Used for the file-import path.
    pub async fn replace_all(&self, activities: &[Activity]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(activities).await?;
        tracing::info!(total = activities.len(), "Archive replaced from import");
        Ok(())
    }

    /// Remove the persisted snapshot entirely. A missing file is not an error.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Archive cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }

    /// Serialize a collection as a pretty-printed export document.
    ///
    /// Pure: does not touch the store. The structure matches the upstream
    /// activity schema, so importing a previous export reproduces the
    /// archive exactly.
    pub fn export_snapshot(activities: &[Activity]) -> Result<String> {
        serde_json::to_string_pretty(activities).map_err(|e| AppError::Storage(e.to_string()))
    }

    async fn persist(&self, activities: &[Activity]) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(activities).map_err(|e| AppError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
            }
        }

        // Write-then-rename so a crash mid-write cannot corrupt the snapshot.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }
}
