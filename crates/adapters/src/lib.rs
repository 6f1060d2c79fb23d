// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-adapters: the dispatch capability seam.
//!
//! The orchestrator depends only on the [`DispatchAdapter`] capability set
//! (`create`, `resume`, `rework`); concrete backends (worker shims, LLM
//! dispatchers) live outside the core and plug in here.

mod artifact;
mod dispatch;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use artifact::{ArtifactStore, DispatchArtifacts};
pub use dispatch::{DispatchAction, DispatchAdapter, DispatchCall, DispatchCallResult};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDispatchAdapter;

use thiserror::Error;

/// Errors raised while persisting or producing dispatch call artifacts.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
