//! Fixed governance policy values.

use conclave_types::{Rank, SECS_PER_DAY};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Name of the category whose votes go through a nomination phase and
    /// whose passing bans the target.
    #[serde(default = "default_ban_category")]
    pub ban_category: String,

    /// Rank from which the Inquisitor is drawn.
    #[serde(default = "default_inquisitor_rank")]
    pub inquisitor_rank: Rank,

    #[serde(default = "default_42_days")]
    pub promotion_cooldown_days: u64,

    /// How long a member may hold the top rank before the retirement sweep
    /// removes them.
    #[serde(default = "default_42_days")]
    pub top_rank_tenure_days: u64,

    /// Fallback when the ban category has no nomination window.
    #[serde(default = "default_nomination_window_hours")]
    pub default_nomination_window_hours: u64,

    /// Fallback for categories without a voting window.
    #[serde(default = "default_voting_window_hours")]
    pub default_voting_window_hours: u64,
}

fn default_ban_category() -> String {
    "BAN".to_string()
}

fn default_inquisitor_rank() -> Rank {
    Rank::Golden
}

fn default_42_days() -> u64 {
    42
}

fn default_nomination_window_hours() -> u64 {
    20
}

fn default_voting_window_hours() -> u64 {
    4
}

impl GovernanceParams {
    pub fn promotion_cooldown_secs(&self) -> u64 {
        self.promotion_cooldown_days.saturating_mul(SECS_PER_DAY)
    }

    pub fn top_rank_tenure_secs(&self) -> u64 {
        self.top_rank_tenure_days.saturating_mul(SECS_PER_DAY)
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            ban_category: default_ban_category(),
            inquisitor_rank: default_inquisitor_rank(),
            promotion_cooldown_days: default_42_days(),
            top_rank_tenure_days: default_42_days(),
            default_nomination_window_hours: default_nomination_window_hours(),
            default_voting_window_hours: default_voting_window_hours(),
        }
    }
}
