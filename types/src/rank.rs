//! Ordered membership ranks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Membership tier, lowest to top.
///
/// The derived ordering follows declaration order, so `Rank::Mason < Rank::Architect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rank {
    Mason,
    Silver,
    Golden,
    Architect,
}

impl Rank {
    pub const LOWEST: Rank = Rank::Mason;
    pub const TOP: Rank = Rank::Architect;
    pub const ALL: [Rank; 4] = [Rank::Mason, Rank::Silver, Rank::Golden, Rank::Architect];

    /// The rank a promotion from `self` leads to, or `None` at the top.
    pub fn next(self) -> Option<Rank> {
        match self {
            Rank::Mason => Some(Rank::Silver),
            Rank::Silver => Some(Rank::Golden),
            Rank::Golden => Some(Rank::Architect),
            Rank::Architect => None,
        }
    }

    pub fn is_top(self) -> bool {
        self == Rank::TOP
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Mason => "MASON",
            Rank::Silver => "SILVER",
            Rank::Golden => "GOLDEN",
            Rank::Architect => "ARCHITECT",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MASON" => Ok(Rank::Mason),
            "SILVER" => Ok(Rank::Silver),
            "GOLDEN" => Ok(Rank::Golden),
            "ARCHITECT" => Ok(Rank::Architect),
            _ => Err(TypeError::UnknownRank(s.to_string())),
        }
    }
}
