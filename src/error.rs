// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy for one polling cycle.
//!
//! Each component owns its error type; [`CycleError`] is what the poller
//! counts against its failure budget.

use thiserror::Error;

pub use crate::api::FetchError;
pub use crate::currencies::StoreError;
pub use crate::models::{NumericFormatError, ParseError};

/// Anything that can abandon a cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    /// The feed could not be retrieved.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The feed body was not a readable rate document.
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    /// A rate value was not a usable decimal.
    #[error("{0}")]
    NumericFormat(#[from] NumericFormatError),

    /// The store rejected or could not perform a write.
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl CycleError {
    /// Short stage name used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
            Self::NumericFormat(_) => "normalize",
            Self::Store(_) => "store",
        }
    }
}
