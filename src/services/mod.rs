// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod aggregate;
pub mod strava;

pub use strava::{StravaClient, SyncCancel, SyncOptions, SyncOutcome, SyncProgress};
