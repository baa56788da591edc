// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use activity_vault::config::Config;
use activity_vault::models::{Activity, ActivityMap};
use activity_vault::routes::create_router;
use activity_vault::AppState;
use std::sync::Arc;

/// Test app over a temp-dir archive. The temp dir lives as long as the app.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

/// Create a test app with an empty archive and an unreachable Strava base.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

/// Create a test app, letting the caller adjust the config first.
#[allow(dead_code)]
pub fn create_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = Config::test_default();
    config.archive_path = dir.path().join("archive.json");
    adjust(&mut config);

    let state = Arc::new(AppState::new(config));
    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

/// Minimal activity record for seeding the archive.
#[allow(dead_code)]
pub fn make_activity(id: u64, sport: &str, start_date: &str, distance: f64) -> Activity {
    Activity {
        id,
        name: format!("Activity {}", id),
        distance,
        moving_time: 1800,
        elapsed_time: 1900,
        total_elevation_gain: 50.0,
        activity_type: sport.to_string(),
        sport_type: None,
        start_date: start_date.to_string(),
        start_date_local: start_date.to_string(),
        timezone: None,
        start_latlng: None,
        end_latlng: None,
        average_speed: 2.5,
        max_speed: 4.0,
        has_heartrate: false,
        average_heartrate: None,
        max_heartrate: None,
        map: None,
    }
}

/// The same record carrying an encoded summary track.
#[allow(dead_code)]
pub fn make_tracked_activity(
    id: u64,
    sport: &str,
    start_date: &str,
    distance: f64,
    polyline: &str,
) -> Activity {
    let mut activity = make_activity(id, sport, start_date, distance);
    activity.map = Some(ActivityMap {
        id: Some(format!("a{}", id)),
        summary_polyline: Some(polyline.to_string()),
        resource_state: Some(2),
    });
    activity
}
