//! Vote category registry.
//!
//! Categories are provisioned out of band (TOML configuration) and are
//! read-only at runtime. Each loaded category carries a typed
//! [`ConsequenceKind`], so closing a vote never branches on the category
//! name.

use std::collections::{BTreeMap, BTreeSet};

use conclave_types::Rank;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, RegistryError};
use crate::params::GovernanceParams;

/// Rule turning ballot counts into PASSED / FAILED.
///
/// Any other spelling in configuration fails to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassCondition {
    /// Strictly more AGREE than DISAGREE. Ties fail.
    Majority,
    /// No DISAGREE and at least one AGREE.
    UnanimousAgree,
}

/// Who may cast ballots: every rank, or an explicit set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EligibleVotersRepr", into = "EligibleVotersRepr")]
pub enum EligibleVoters {
    All,
    Ranks(BTreeSet<Rank>),
}

impl EligibleVoters {
    pub fn ranks(ranks: impl IntoIterator<Item = Rank>) -> Self {
        Self::Ranks(ranks.into_iter().collect())
    }

    pub fn admits(&self, rank: Rank) -> bool {
        match self {
            Self::All => true,
            Self::Ranks(set) => set.contains(&rank),
        }
    }
}

/// Configuration form: the string `"ALL"` or a list of rank names.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum EligibleVotersRepr {
    Sentinel(String),
    Ranks(Vec<Rank>),
}

impl TryFrom<EligibleVotersRepr> for EligibleVoters {
    type Error = String;

    fn try_from(repr: EligibleVotersRepr) -> Result<Self, Self::Error> {
        match repr {
            EligibleVotersRepr::Sentinel(s) if s == "ALL" => Ok(Self::All),
            EligibleVotersRepr::Sentinel(s) => {
                Err(format!("expected \"ALL\" or a list of ranks, got \"{s}\""))
            }
            EligibleVotersRepr::Ranks(ranks) => Ok(Self::Ranks(ranks.into_iter().collect())),
        }
    }
}

impl From<EligibleVoters> for EligibleVotersRepr {
    fn from(voters: EligibleVoters) -> Self {
        match voters {
            EligibleVoters::All => Self::Sentinel("ALL".to_string()),
            EligibleVoters::Ranks(set) => Self::Ranks(set.into_iter().collect()),
        }
    }
}

/// What a PASSED vote with a target does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceKind {
    /// Deactivate the target and blacklist their last known origin.
    Ban,
    /// Move the target to the given rank.
    PromoteTo(Rank),
    /// Nothing is applied; the pass is only logged.
    None,
}

/// One `[[categories]]` entry as written in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,

    /// Absent means the category has no nomination phase.
    #[serde(default)]
    pub nomination_window_hours: Option<u64>,

    /// Absent falls back to [`GovernanceParams::default_voting_window_hours`].
    #[serde(default)]
    pub voting_window_hours: Option<u64>,

    pub eligible_voters: EligibleVoters,

    pub pass_condition: PassCondition,

    #[serde(default)]
    pub inquisitor_can_initiate: bool,

    /// Absent is resolved from the name at load: the ban category bans,
    /// `PROMOTE_<RANK>` promotes, anything else has no consequence.
    #[serde(default)]
    pub consequence: Option<ConsequenceKind>,
}

/// A loaded, validated category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteCategory {
    pub name: String,
    pub nomination_window_hours: Option<u64>,
    pub voting_window_hours: u64,
    pub eligible_voters: EligibleVoters,
    pub pass_condition: PassCondition,
    pub inquisitor_can_initiate: bool,
    pub consequence: ConsequenceKind,
}

pub struct CategoryRegistry {
    categories: BTreeMap<String, VoteCategory>,
    ban_category: String,
}

impl CategoryRegistry {
    /// Validate `configs` and resolve every category's consequence.
    pub fn load(
        configs: &[CategoryConfig],
        params: &GovernanceParams,
    ) -> Result<Self, RegistryError> {
        let mut categories = BTreeMap::new();
        for config in configs {
            let category = resolve(config, params)?;
            if categories.contains_key(&category.name) {
                return Err(RegistryError::DuplicateCategory(category.name));
            }
            categories.insert(category.name.clone(), category);
        }
        tracing::debug!(count = categories.len(), "loaded vote categories");
        Ok(Self {
            categories,
            ban_category: params.ban_category.clone(),
        })
    }

    /// The registry shipped by default: a ban vote and one promotion vote
    /// per rank step.
    pub fn standard(params: &GovernanceParams) -> Result<Self, RegistryError> {
        Self::load(&standard_categories(params), params)
    }

    pub fn get(&self, name: &str) -> Option<&VoteCategory> {
        self.categories.get(name)
    }

    /// Look up a category an operation depends on. Absence is a
    /// configuration fault, never defaulted.
    pub fn lookup(&self, name: &str) -> Result<&VoteCategory, GovernanceError> {
        self.get(name).ok_or_else(|| {
            GovernanceError::Configuration(format!("vote category '{name}' is not configured"))
        })
    }

    pub fn ban_category_name(&self) -> &str {
        &self.ban_category
    }

    pub fn ban_category(&self) -> Result<&VoteCategory, GovernanceError> {
        self.lookup(&self.ban_category)
    }

    pub fn is_ban_category(&self, category: &VoteCategory) -> bool {
        category.name == self.ban_category
    }

    /// The category whose passing promotes its target to `rank`.
    pub fn promotion_category(&self, rank: Rank) -> Result<&VoteCategory, GovernanceError> {
        self.categories
            .values()
            .find(|c| c.consequence == ConsequenceKind::PromoteTo(rank))
            .ok_or_else(|| {
                GovernanceError::Configuration(format!(
                    "no vote category promotes to {rank}"
                ))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoteCategory> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn resolve(
    config: &CategoryConfig,
    params: &GovernanceParams,
) -> Result<VoteCategory, RegistryError> {
    let name = config.name.trim();
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if let EligibleVoters::Ranks(set) = &config.eligible_voters {
        if set.is_empty() {
            return Err(RegistryError::NoEligibleVoters(name.to_string()));
        }
    }
    let voting_window_hours = config
        .voting_window_hours
        .unwrap_or(params.default_voting_window_hours);
    if voting_window_hours == 0 {
        return Err(RegistryError::ZeroVotingWindow(name.to_string()));
    }
    if config.nomination_window_hours == Some(0) {
        return Err(RegistryError::ZeroNominationWindow(name.to_string()));
    }
    let consequence = config
        .consequence
        .unwrap_or_else(|| consequence_from_name(name, params));

    Ok(VoteCategory {
        name: name.to_string(),
        nomination_window_hours: config.nomination_window_hours,
        voting_window_hours,
        eligible_voters: config.eligible_voters.clone(),
        pass_condition: config.pass_condition,
        inquisitor_can_initiate: config.inquisitor_can_initiate,
        consequence,
    })
}

fn consequence_from_name(name: &str, params: &GovernanceParams) -> ConsequenceKind {
    if name == params.ban_category {
        return ConsequenceKind::Ban;
    }
    name.strip_prefix("PROMOTE_")
        .and_then(|rank| rank.parse::<Rank>().ok())
        .map(ConsequenceKind::PromoteTo)
        .unwrap_or(ConsequenceKind::None)
}

/// Category configuration for the default registry.
pub fn standard_categories(params: &GovernanceParams) -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            name: params.ban_category.clone(),
            nomination_window_hours: Some(params.default_nomination_window_hours),
            voting_window_hours: Some(params.default_voting_window_hours),
            eligible_voters: EligibleVoters::ranks([Rank::Silver, Rank::Golden]),
            pass_condition: PassCondition::Majority,
            inquisitor_can_initiate: true,
            consequence: Some(ConsequenceKind::Ban),
        },
        CategoryConfig {
            name: "PROMOTE_SILVER".to_string(),
            nomination_window_hours: None,
            voting_window_hours: Some(24),
            eligible_voters: EligibleVoters::ranks([Rank::Silver, Rank::Golden, Rank::Architect]),
            pass_condition: PassCondition::Majority,
            inquisitor_can_initiate: false,
            consequence: Some(ConsequenceKind::PromoteTo(Rank::Silver)),
        },
        CategoryConfig {
            name: "PROMOTE_GOLDEN".to_string(),
            nomination_window_hours: None,
            voting_window_hours: Some(24),
            eligible_voters: EligibleVoters::ranks([Rank::Golden, Rank::Architect]),
            pass_condition: PassCondition::Majority,
            inquisitor_can_initiate: false,
            consequence: Some(ConsequenceKind::PromoteTo(Rank::Golden)),
        },
        CategoryConfig {
            name: "PROMOTE_ARCHITECT".to_string(),
            nomination_window_hours: None,
            voting_window_hours: Some(24),
            eligible_voters: EligibleVoters::ranks([Rank::Silver]),
            pass_condition: PassCondition::UnanimousAgree,
            inquisitor_can_initiate: false,
            consequence: Some(ConsequenceKind::PromoteTo(Rank::Architect)),
        },
    ]
}
