//! Price change direction.

use crate::decimal::Price;
use crate::market::AssetId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the most recent price change of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Increased,
    Decreased,
    #[default]
    None,
}

impl ChangeDirection {
    /// Compare an old price with a new one.
    pub fn between(old: Price, new: Price) -> Self {
        match new.cmp(&old) {
            std::cmp::Ordering::Greater => Self::Increased,
            std::cmp::Ordering::Less => Self::Decreased,
            std::cmp::Ordering::Equal => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increased => write!(f, "increased"),
            Self::Decreased => write!(f, "decreased"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Emitted for every live delta that moved a record's price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: AssetId,
    pub direction: ChangeDirection,
}
