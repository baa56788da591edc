// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models.

pub mod activity;

pub use activity::{Activity, ActivityMap};
