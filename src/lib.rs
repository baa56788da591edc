// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity Vault: sync, archive, and analyze Strava activity history
//!
//! This crate provides the backend API for pulling an athlete's complete
//! activity history from Strava, merging it into a durable local archive,
//! and serving derived analytical views (KPIs, breakdowns, time series,
//! frequency grids, decoded GPS tracks) to a web frontend.

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ActivityArchive;
use services::{StravaClient, SyncCancel, SyncProgress};
use tokio::sync::watch;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub archive: ActivityArchive,
    pub strava: StravaClient,
    /// Latest progress of the in-flight (or last) sync
    pub sync_progress: watch::Sender<SyncProgress>,
    /// Cooperative cancellation flag for the in-flight sync
    pub sync_cancel: SyncCancel,
}

impl AppState {
    /// Build state from configuration.
    pub fn new(config: Config) -> Self {
        let archive = ActivityArchive::new(config.archive_path.clone());
        let strava = StravaClient::with_base_url(config.strava_api_base.clone());
        let (sync_progress, _) = watch::channel(SyncProgress::idle());
        Self {
            config,
            archive,
            strava,
            sync_progress,
            sync_cancel: SyncCancel::default(),
        }
    }
}
