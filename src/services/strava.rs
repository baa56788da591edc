// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client and full-history sync driver.
//!
//! Handles:
//! - Paginated activity fetching with coarse progress reporting
//! - Total-count estimation via the athlete stats endpoint
//! - Bounded retry on transient transport failures
//! - Cooperative cancellation between page requests
//! - OAuth code exchange (the redirect flow itself lives in the frontend)

use crate::error::{AppError, Result};
use crate::models::Activity;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Activities requested per page; the Strava maximum.
pub const PER_PAGE: u32 = 200;

/// Attempts per page request before the failure is surfaced.
const MAX_ATTEMPTS: u32 = 3;

/// Initial delay between attempts, doubled after each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
}

/// One progress event emitted during a sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    /// Coarse completion estimate, 0-100
    pub percent: u8,
    /// Activities fetched so far
    pub fetched: usize,
    /// Human-readable status line
    pub status: String,
}

impl SyncProgress {
    /// The state reported before any sync has run.
    pub fn idle() -> Self {
        Self {
            percent: 0,
            fetched: 0,
            status: "Idle".to_string(),
        }
    }
}

/// One-way progress channel; the sequence is finite and ends when the
/// sync driver drops its sender.
pub type ProgressSender = UnboundedSender<SyncProgress>;

/// Shared cancellation flag. Setting it stops the driver before the next
/// page request; activities gathered so far are still returned.
#[derive(Clone, Default)]
pub struct SyncCancel(Arc<AtomicBool>);

impl SyncCancel {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Knobs for a full-history fetch.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub per_page: u32,
    /// Hard bound on page requests; hitting it surfaces `truncated`
    pub max_pages: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            per_page: PER_PAGE,
            max_pages: 100,
        }
    }
}

/// Outcome of a full-history fetch.
#[derive(Debug)]
pub struct SyncOutcome {
    /// All pages concatenated in arrival order, no deduplication
    pub activities: Vec<Activity>,
    /// Page requests issued
    pub pages: u32,
    /// True if the page bound was reached before an empty page
    pub truncated: bool,
    /// True if the fetch was cancelled mid-way
    pub cancelled: bool,
}

/// Page-request failure, classified for the retry loop.
enum FetchError {
    Auth,
    Transient(String),
    Fatal(String),
}

impl StravaClient {
    /// Create a client against the production Strava API.
    pub fn new() -> Self {
        Self::with_base_url("https://www.strava.com/api/v3")
    }

    /// Create a client against an alternate base URL (tests point this at a
    /// local stub server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the athlete's complete activity history, page by page.
    ///
    /// Pages are requested strictly sequentially so progress stays monotonic
    /// and the page bound is meaningful. Progress is emitted before each
    /// page request and once more at 100% after exhaustion.
    pub async fn fetch_all(
        &self,
        access_token: &str,
        options: &SyncOptions,
        progress: Option<&ProgressSender>,
        cancel: &SyncCancel,
    ) -> Result<SyncOutcome> {
        // Estimate failure is non-fatal; progress degrades to a page-count
        // heuristic when the estimate is unknown.
        let estimate = self.estimate_total(access_token).await;
        tracing::debug!(estimate, "Starting full-history fetch");

        let mut activities: Vec<Activity> = Vec::new();
        let mut page = 1u32;
        let mut pages = 0u32;
        let mut truncated = false;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(fetched = activities.len(), "Sync cancelled");
                cancelled = true;
                break;
            }
            if page > options.max_pages {
                tracing::warn!(
                    max_pages = options.max_pages,
                    fetched = activities.len(),
                    "Page bound reached before the history was exhausted; sync truncated"
                );
                truncated = true;
                break;
            }

            let percent = if estimate > 0 {
                (activities.len() as u64 * 100 / estimate).min(98) as u8
            } else {
                (page as u64 * 5).min(95) as u8
            };
            emit(
                progress,
                percent,
                activities.len(),
                format!("Fetching page {}...", page),
            );

            let batch = self
                .get_activities_page_with_retry(access_token, page, options.per_page)
                .await?;
            pages += 1;
            if batch.is_empty() {
                break;
            }
            activities.extend(batch);
            page += 1;
        }

        let status = if cancelled {
            format!("Cancelled after {} activities", activities.len())
        } else if truncated {
            format!("Stopped at page bound with {} activities", activities.len())
        } else {
            format!("Fetched {} activities", activities.len())
        };
        emit(progress, 100, activities.len(), status);

        Ok(SyncOutcome {
            activities,
            pages,
            truncated,
            cancelled,
        })
    }

    /// Lifetime activity count from the athlete's stats, or 0 when the
    /// lookup fails or the profile is unavailable.
    async fn estimate_total(&self, access_token: &str) -> u64 {
        let athlete: AthleteProfile = match self
            .get_json(&format!("{}/athlete", self.base_url), access_token)
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!(error = %e, "Athlete lookup failed, estimate unavailable");
                return 0;
            }
        };

        let url = format!("{}/athletes/{}/stats", self.base_url, athlete.id);
        match self.get_json::<AthleteStats>(&url, access_token).await {
            Ok(stats) => stats.lifetime_count(),
            Err(e) => {
                tracing::debug!(error = %e, "Stats lookup failed, estimate unavailable");
                0
            }
        }
    }

    /// Fetch one activity page, retrying transient failures with backoff.
    async fn get_activities_page_with_retry(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Activity>> {
        let mut backoff = RETRY_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.get_activities_page(access_token, page, per_page).await {
                Ok(batch) => return Ok(batch),
                Err(FetchError::Auth) => return Err(AppError::Auth),
                Err(FetchError::Fatal(msg)) => return Err(AppError::Transport(msg)),
                Err(FetchError::Transient(msg)) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(page, attempt, error = %msg, "Transient page failure, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(FetchError::Transient(msg)) => return Err(AppError::Transport(msg)),
            }
        }
    }

    async fn get_activities_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> std::result::Result<Vec<Activity>, FetchError> {
        let url = format!("{}/athlete/activities", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(FetchError::Auth);
            }
            let msg = format!("HTTP {}: {}", status, body);
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(FetchError::Transient(msg));
            }
            return Err(FetchError::Fatal(msg));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Fatal(format!("JSON parse error: {}", e)))
    }

    /// Exchange an OAuth authorization code for tokens.
    pub async fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<TokenExchangeResponse> {
        let response = self
            .http
            .post("https://www.strava.com/oauth/token")
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            if status.as_u16() == 400 || status.as_u16() == 401 {
                return Err(AppError::Auth);
            }
            return Err(AppError::Transport(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to parse token response: {}", e)))
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(AppError::Auth);
            }
            return Err(AppError::Transport(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
    }
}

impl Default for StravaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(progress: Option<&ProgressSender>, percent: u8, fetched: usize, status: String) {
    if let Some(sender) = progress {
        let _ = sender.send(SyncProgress {
            percent,
            fetched,
            status,
        });
    }
}

/// Authenticated athlete profile, as much of it as the estimate needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AthleteProfile {
    pub id: u64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// Lifetime totals per sport from the athlete stats endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthleteStats {
    #[serde(default)]
    pub all_run_totals: ActivityTotals,
    #[serde(default)]
    pub all_ride_totals: ActivityTotals,
    #[serde(default)]
    pub all_swim_totals: ActivityTotals,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityTotals {
    #[serde(default)]
    pub count: u64,
}

impl AthleteStats {
    /// Sum of run/ride/swim lifetime counts.
    pub fn lifetime_count(&self) -> u64 {
        self.all_run_totals.count + self.all_ride_totals.count + self.all_swim_totals.count
    }
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete: Option<AthleteProfileSummary>,
}

/// Athlete info embedded in the token exchange response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteProfileSummary {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}
