// Copyright 2026 Court Scout Contributors
// SPDX-License-Identifier: MIT

//! Court Scout runtime: case status and cause-list acquisition from court
//! portals that throttle, challenge and restructure their pages.
//!
//! The [`orchestrator::Orchestrator`] ties the pieces together: cache
//! lookup, portal fan-out through the [`acquisition`] session layer,
//! extraction, and a clearly labeled synthetic fallback when every portal
//! fails.

pub mod acquisition;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod fallback;
pub mod jobs;
pub mod orchestrator;
pub mod portals;
pub mod types;
