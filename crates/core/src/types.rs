//! Shared vocabulary for null-model hypothesis testing.
//!
//! These enums cross crate boundaries: the engine matches on them, the
//! configuration layer deserializes them, and the CLI parses them from
//! command-line strings.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Tail of the null distribution an observed statistic is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Observed value is unusually small.
    Less,
    /// Observed value is unusually large.
    Greater,
    /// Observed value is unusually far from the null mean in either direction.
    #[default]
    TwoSided,
}

impl Direction {
    /// Returns the external string name of the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::Greater => "greater",
            Self::TwoSided => "two-sided",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "less" => Ok(Self::Less),
            "greater" => Ok(Self::Greater),
            "two-sided" | "twosided" | "both" => Ok(Self::TwoSided),
            _ => Err(anyhow!(
                "Unknown direction: '{}'. Valid directions: less, greater, two-sided",
                s
            )),
        }
    }
}

/// Null-model selector.
///
/// This is the full external enumeration used by the hypothesis modules.
/// Only the unrestricted, block and schedule-preserving variants have a
/// dedicated resampling scheme; see [`NullModelType::dedicated_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullModelType {
    /// Full random shuffle.
    #[default]
    Permutation,
    /// Independent, identically distributed draws; realised as a full shuffle.
    Iid,
    /// Shuffle the order of contiguous fixed-size blocks.
    BlockPermutation,
    /// Shuffle only within same-weekday groups.
    SchedulePreserving,
    /// Resampling with replacement.
    Bootstrap,
    /// Draws from a fitted parametric distribution.
    Parametric,
}

/// Which resampling family a null-model type maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Unrestricted,
    Block,
    SchedulePreserving,
}

impl NullModelType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Permutation,
        Self::Iid,
        Self::BlockPermutation,
        Self::SchedulePreserving,
        Self::Bootstrap,
        Self::Parametric,
    ];

    /// Returns the external string name (`"SCHEDULE_PRESERVING"`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Permutation => "PERMUTATION",
            Self::Iid => "IID",
            Self::BlockPermutation => "BLOCK_PERMUTATION",
            Self::SchedulePreserving => "SCHEDULE_PRESERVING",
            Self::Bootstrap => "BOOTSTRAP",
            Self::Parametric => "PARAMETRIC",
        }
    }

    /// Returns the resampling family for this type, or `None` when the
    /// engine has no dedicated generator and degrades to a full shuffle.
    #[must_use]
    pub const fn dedicated_strategy(&self) -> Option<StrategyKind> {
        match self {
            Self::Permutation | Self::Iid => Some(StrategyKind::Unrestricted),
            Self::BlockPermutation => Some(StrategyKind::Block),
            Self::SchedulePreserving => Some(StrategyKind::SchedulePreserving),
            Self::Bootstrap | Self::Parametric => None,
        }
    }
}

impl fmt::Display for NullModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NullModelType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown null model type: '{}'. Valid types: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(NullModelType::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}
