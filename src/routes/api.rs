// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: sync, archive management, and derived views.
//!
//! Handlers stay thin: parse the filter selection, load the archive, hand
//! off to the aggregation functions, serialize.

use crate::codec;
use crate::db::{ActivityArchive, MergeStats};
use crate::error::{AppError, Result};
use crate::models::Activity;
use crate::services::aggregate::{
    self, ActivityFilter, ArchiveRecap, DayCount, KpiSummary, KpiTotals, PerformancePoint,
    SportShare, TimeBucket,
};
use crate::services::strava::SyncProgress;
use crate::time_utils::export_stamp;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync", post(run_sync))
        .route("/api/sync/progress", get(get_sync_progress))
        .route("/api/sync/cancel", post(cancel_sync))
        .route("/api/activities", get(get_activities))
        .route("/api/facets", get(get_facets))
        .route("/api/stats/summary", get(get_summary))
        .route("/api/stats/recap", get(get_recap))
        .route("/api/stats/performance", get(get_performance))
        .route("/api/stats/signature", get(get_signature))
        .route("/api/stats/breakdown", get(get_breakdown))
        .route("/api/stats/time-of-day", get(get_time_of_day))
        .route("/api/stats/frequency", get(get_frequency))
        .route("/api/tracks", get(get_tracks))
        .route("/api/export", get(export_archive))
        .route("/api/import", post(import_archive))
        .route("/api/archive", delete(clear_archive))
}

// ─── Filter parsing ──────────────────────────────────────────

const ALL_SENTINEL: &str = "ALL";

#[derive(Deserialize, Default)]
struct ViewQuery {
    /// Calendar year or "ALL"
    year: Option<String>,
    /// Comma-separated sport list or "ALL"
    sports: Option<String>,
    /// Single sport, for the per-sport views
    sport: Option<String>,
}

fn parse_filter(query: &ViewQuery) -> Result<ActivityFilter> {
    let year = match query.year.as_deref() {
        None | Some(ALL_SENTINEL) | Some("") => None,
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            AppError::BadRequest("Invalid 'year' parameter: must be a calendar year or ALL".into())
        })?),
    };

    let sports = match query.sports.as_deref() {
        None | Some(ALL_SENTINEL) | Some("") => None,
        Some(raw) => {
            let set: HashSet<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if set.is_empty() || set.contains(ALL_SENTINEL) {
                None
            } else {
                Some(set)
            }
        }
    };

    Ok(ActivityFilter { year, sports })
}

fn require_sport(query: &ViewQuery) -> Result<&str> {
    query
        .sport
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'sport' parameter".into()))
}

// ─── Sync ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SyncRequest {
    access_token: String,
}

#[derive(Serialize)]
struct SyncResponse {
    fetched: usize,
    pages: u32,
    truncated: bool,
    cancelled: bool,
    merged: MergeStats,
    completed_at: String,
}

/// Fetch the full history from Strava and merge it into the archive.
///
/// Progress events are logged and mirrored into the shared progress state
/// for `GET /api/sync/progress` to report.
async fn run_sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    state.sync_cancel.reset();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SyncProgress>();
    let progress_state = state.clone();
    let drain = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            tracing::info!(
                percent = update.percent,
                fetched = update.fetched,
                status = %update.status,
                "Sync progress"
            );
            progress_state.sync_progress.send_replace(update);
        }
    });

    let outcome = state
        .strava
        .fetch_all(
            &request.access_token,
            &state.config.sync_options(),
            Some(&tx),
            &state.sync_cancel,
        )
        .await;
    drop(tx);
    let _ = drain.await;
    let outcome = outcome?;

    let merged = state.archive.merge_and_persist(&outcome.activities).await?;

    Ok(Json(SyncResponse {
        fetched: outcome.activities.len(),
        pages: outcome.pages,
        truncated: outcome.truncated,
        cancelled: outcome.cancelled,
        merged,
        completed_at: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
    }))
}

/// Latest progress snapshot of the current (or last) sync.
async fn get_sync_progress(State(state): State<Arc<AppState>>) -> Json<SyncProgress> {
    Json(state.sync_progress.borrow().clone())
}

#[derive(Serialize)]
struct CancelResponse {
    cancelled: bool,
}

/// Stop the in-flight sync before its next page request.
async fn cancel_sync(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    state.sync_cancel.cancel();
    Json(CancelResponse { cancelled: true })
}

// ─── Activities & facets ─────────────────────────────────────

async fn get_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<Activity>>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    Ok(Json(selected.into_iter().cloned().collect()))
}

#[derive(Serialize)]
struct FacetsResponse {
    years: Vec<String>,
    sports: Vec<String>,
}

/// Distinct years (descending) and sports (ascending) present in the
/// archive, each with the "ALL" option prepended.
async fn get_facets(State(state): State<Arc<AppState>>) -> Result<Json<FacetsResponse>> {
    let archive = state.archive.load().await?;

    let mut years = vec![ALL_SENTINEL.to_string()];
    years.extend(aggregate::year_facets(&archive).iter().map(i32::to_string));
    let mut sports = vec![ALL_SENTINEL.to_string()];
    sports.extend(aggregate::sport_facets(&archive));

    Ok(Json(FacetsResponse { years, sports }))
}

// ─── Derived views ───────────────────────────────────────────

#[derive(Serialize)]
struct SummaryResponse {
    totals: KpiTotals,
    summary: KpiSummary,
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<SummaryResponse>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    let totals = aggregate::kpi_totals(&selected);
    Ok(Json(SummaryResponse {
        totals,
        summary: aggregate::kpi_summary(&totals),
    }))
}

async fn get_recap(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ArchiveRecap>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    Ok(Json(aggregate::archive_recap(&selected)))
}

async fn get_performance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<PerformancePoint>>> {
    let sport = require_sport(&query)?.to_string();
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    Ok(Json(aggregate::performance_series(&selected, &sport)))
}

#[derive(Serialize)]
struct TrackBounds {
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
}

#[derive(Serialize)]
struct SignatureResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<Vec<[f64; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<TrackBounds>,
}

/// The longest activity of the selected sport, decorated with its decoded
/// track and bounding box for the map highlight. A malformed track is
/// skipped, not fatal.
async fn get_signature(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<SignatureResponse>> {
    let sport = require_sport(&query)?.to_string();
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);

    let Some(signature) = aggregate::signature_activity(&selected, &sport) else {
        return Ok(Json(SignatureResponse {
            activity: None,
            track: None,
            bounds: None,
        }));
    };

    let mut track = None;
    let mut bounds = None;
    if let Some(encoded) = signature.summary_polyline() {
        match codec::decode(encoded) {
            Ok(line) => {
                bounds = codec::track_bounds(&line).map(|rect| TrackBounds {
                    min_lat: rect.min().y,
                    min_lng: rect.min().x,
                    max_lat: rect.max().y,
                    max_lng: rect.max().x,
                });
                track = Some(line.coords().map(|c| [c.y, c.x]).collect());
            }
            Err(e) => {
                tracing::warn!(activity_id = signature.id, error = %e, "Skipping malformed track");
            }
        }
    }

    Ok(Json(SignatureResponse {
        activity: Some(signature.clone()),
        track,
        bounds,
    }))
}

/// Sport share over the year-filtered collection; the sport selection is
/// deliberately ignored here so the breakdown always shows the whole mix.
async fn get_breakdown(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<SportShare>>> {
    let selection = parse_filter(&query)?.year_only();
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    Ok(Json(aggregate::sport_breakdown(&selected)))
}

async fn get_time_of_day(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<TimeBucket>>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    Ok(Json(aggregate::time_of_day(&selected)))
}

async fn get_frequency(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<DayCount>>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);
    let today = chrono::Utc::now().date_naive();
    Ok(Json(aggregate::frequency_grid(&selected, today)))
}

/// Decoded tracks of the filtered activities as a GeoJSON FeatureCollection.
/// Activities without a track, and tracks that fail to decode, are skipped.
async fn get_tracks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<geojson::FeatureCollection>> {
    let selection = parse_filter(&query)?;
    let archive = state.archive.load().await?;
    let selected = aggregate::filter(&archive, &selection);

    let mut features = Vec::new();
    for activity in selected {
        let Some(encoded) = activity.summary_polyline() else {
            continue;
        };
        let line = match codec::decode(encoded) {
            Ok(line) if !line.0.is_empty() => line,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(activity_id = activity.id, error = %e, "Skipping malformed track");
                continue;
            }
        };

        let mut properties = geojson::JsonObject::new();
        properties.insert("id".to_string(), activity.id.into());
        properties.insert("name".to_string(), activity.name.clone().into());
        properties.insert("type".to_string(), activity.activity_type.clone().into());

        features.push(geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
            id: Some(geojson::feature::Id::Number(activity.id.into())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok(Json(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }))
}

// ─── Import / export / reset ─────────────────────────────────

/// Download the archive as a pretty-printed JSON document.
async fn export_archive(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let archive = state.archive.load().await?;
    let document = ActivityArchive::export_snapshot(&archive)?;
    let filename = format!(
        "activity_vault_export_{}.json",
        export_stamp(chrono::Utc::now())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        document,
    ))
}

#[derive(Serialize)]
struct ImportResponse {
    imported: usize,
}

/// Replace the archive wholesale with an uploaded JSON array.
///
/// A document that fails structural parsing is rejected and the archive is
/// left untouched.
async fn import_archive(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ImportResponse>> {
    let activities: Vec<Activity> =
        serde_json::from_str(&body).map_err(|e| AppError::ImportParse(e.to_string()))?;

    state.archive.replace_all(&activities).await?;
    Ok(Json(ImportResponse {
        imported: activities.len(),
    }))
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

/// Remove the archived snapshot entirely.
async fn clear_archive(State(state): State<Arc<AppState>>) -> Result<Json<ClearResponse>> {
    state.archive.clear().await?;
    Ok(Json(ClearResponse { cleared: true }))
}
