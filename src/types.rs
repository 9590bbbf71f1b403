//! Common types used throughout fnavro
//!
//! This module contains shared type definitions and policy enums
//! used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Rounding Mode
// ============================================================================

/// How a decimal with more fractional digits than the field scale is constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round to nearest, ties to the even neighbour (banker's rounding)
    #[default]
    HalfEven,
    /// Round to nearest, ties away from zero
    HalfUp,
    /// Truncate toward zero
    Down,
    /// Refuse to round: excess precision is a mapping error
    Unnecessary,
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingMode::HalfEven => write!(f, "half_even"),
            RoundingMode::HalfUp => write!(f, "half_up"),
            RoundingMode::Down => write!(f, "down"),
            RoundingMode::Unnecessary => write!(f, "unnecessary"),
        }
    }
}

// ============================================================================
// Empty Shard Policy
// ============================================================================

/// What to do with shards that received no records when a writer closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyShardPolicy {
    /// Do not upload anything for empty shards
    #[default]
    Skip,
    /// Upload a header-only container carrying just the schema
    WriteEmpty,
}
