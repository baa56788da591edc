// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model for the archive and API payloads.
//!
//! The field set mirrors the activity objects the Strava list endpoint
//! returns, so an exported snapshot re-imports without translation. Unknown
//! upstream fields are ignored; absent optional fields stay absent on output.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One exercise session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID; the merge key, stable across syncs
    pub id: u64,
    /// Activity name/title
    pub name: String,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: u64,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: u64,
    /// Elevation gain in meters, stored as the API reports it
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Sport category (Run, Ride, Hike, etc.)
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Newer sport taxonomy, when the API sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_type: Option<String>,
    /// Start instant (ISO 8601, UTC)
    pub start_date: String,
    /// Start wall-clock time at the activity's location
    pub start_date_local: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_latlng: Option<Vec<f64>>,
    /// Average speed in meters/second
    #[serde(default)]
    pub average_speed: f64,
    /// Max speed in meters/second
    #[serde(default)]
    pub max_speed: f64,
    #[serde(default)]
    pub has_heartrate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_heartrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heartrate: Option<f64>,
    /// Map data; absent for indoor/untracked activities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<ActivityMap>,
}

/// Activity map data with the encoded summary track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_polyline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_state: Option<u8>,
}

impl Activity {
    /// The encoded summary track, if the activity has one.
    pub fn summary_polyline(&self) -> Option<&str> {
        self.map
            .as_ref()
            .and_then(|m| m.summary_polyline.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// Start instant parsed as UTC. `None` if the timestamp is malformed.
    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.start_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Calendar year of the start instant.
    pub fn start_year(&self) -> Option<i32> {
        self.start_instant().map(|dt| dt.year())
    }

    /// Zero-based calendar month of the start instant.
    pub fn start_month0(&self) -> Option<usize> {
        self.start_instant().map(|dt| dt.month0() as usize)
    }

    /// UTC date portion of the start instant, for the frequency grid.
    pub fn start_date_utc(&self) -> Option<NaiveDate> {
        self.start_instant().map(|dt| dt.date_naive())
    }

    /// Wall-clock hour of `start_date_local`, ignoring its offset suffix.
    pub fn local_hour(&self) -> Option<u32> {
        DateTime::parse_from_rfc3339(&self.start_date_local)
            .ok()
            .map(|dt| dt.naive_local().hour())
    }
}
