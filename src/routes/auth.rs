// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token exchange endpoint.
//!
//! The browser frontend drives the redirect flow and calls back here once
//! with the authorization code; everything downstream only sees the
//! resulting bearer token.

use crate::error::Result;
use crate::services::strava::TokenExchangeResponse;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/exchange", post(exchange_token))
}

#[derive(Deserialize)]
struct ExchangeRequest {
    client_id: String,
    client_secret: String,
    code: String,
}

/// Exchange an authorization code for tokens.
async fn exchange_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<TokenExchangeResponse>> {
    let tokens = state
        .strava
        .exchange_token(&request.client_id, &request.client_secret, &request.code)
        .await?;

    tracing::info!(
        athlete_id = tokens.athlete.as_ref().map(|a| a.id),
        "OAuth code exchanged"
    );
    Ok(Json(tokens))
}
