// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence for the activity archive.

pub mod archive;

pub use archive::{ActivityArchive, MergeStats};
