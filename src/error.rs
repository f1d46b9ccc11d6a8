//! Error types for refine calculations and rules loading.

use crate::refine::{ItemCategory, RefineLevel};
use thiserror::Error;

/// Errors surfaced by the refine engine.
///
/// Gaps in the rate table are never errors (they read as a 0% rate); these
/// variants cover caller contract violations and configuration I/O.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("unknown item category: {0:?} (expected \"weapon\" or \"armor\")")]
    UnknownCategory(String),

    #[error("target level +{target} must be above current level +{current}")]
    InvalidTarget {
        current: RefineLevel,
        target: RefineLevel,
    },

    #[error("level +{level} is beyond the {category} table (max +{max})")]
    LevelOutOfRange {
        category: ItemCategory,
        level: RefineLevel,
        max: RefineLevel,
    },

    #[error("{category} is already at +{level}, the highest level in its table")]
    LevelAtMaximum {
        category: ItemCategory,
        level: RefineLevel,
    },

    #[error("invalid {category} rate {rate} for +{from} -> +{to}: must be within [0, 1]")]
    InvalidRate {
        category: ItemCategory,
        from: RefineLevel,
        to: RefineLevel,
        rate: f64,
    },

    #[error("target level +{0} already reached")]
    TargetReached(RefineLevel),

    #[error("item was destroyed at +{0}")]
    ItemDestroyed(RefineLevel),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RefineError>;
