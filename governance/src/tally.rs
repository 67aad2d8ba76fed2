//! Ballot counting and pass conditions.

use conclave_types::{Ballot, Decision, VoteOutcome};
use serde::Serialize;

use crate::registry::PassCondition;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub agree: u32,
    pub disagree: u32,
}

impl Tally {
    pub fn from_ballots(ballots: &[Ballot]) -> Self {
        ballots.iter().fold(Self::default(), |mut t, b| {
            match b.decision {
                Decision::Agree => t.agree += 1,
                Decision::Disagree => t.disagree += 1,
            }
            t
        })
    }

    /// Ballots cast. Reported, never used as a quorum.
    pub fn total(&self) -> u32 {
        self.agree + self.disagree
    }

    pub fn passes(&self, condition: PassCondition) -> bool {
        match condition {
            PassCondition::Majority => self.agree > self.disagree,
            PassCondition::UnanimousAgree => self.disagree == 0 && self.agree > 0,
        }
    }

    pub fn outcome(&self, condition: PassCondition) -> VoteOutcome {
        if self.passes(condition) {
            VoteOutcome::Passed
        } else {
            VoteOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_types::{MemberId, Timestamp, VoteId};
    use proptest::prelude::*;

    fn t(agree: u32, disagree: u32) -> Tally {
        Tally { agree, disagree }
    }

    #[test]
    fn majority_tie_fails() {
        assert_eq!(t(1, 1).outcome(PassCondition::Majority), VoteOutcome::Failed);
    }

    #[test]
    fn majority_single_agree_passes() {
        assert_eq!(t(1, 0).outcome(PassCondition::Majority), VoteOutcome::Passed);
    }

    #[test]
    fn majority_without_ballots_fails() {
        assert_eq!(t(0, 0).outcome(PassCondition::Majority), VoteOutcome::Failed);
    }

    #[test]
    fn unanimous_without_ballots_fails() {
        assert_eq!(t(0, 0).outcome(PassCondition::UnanimousAgree), VoteOutcome::Failed);
    }

    #[test]
    fn unanimous_single_dissent_fails() {
        assert_eq!(t(9, 1).outcome(PassCondition::UnanimousAgree), VoteOutcome::Failed);
        assert_eq!(t(3, 0).outcome(PassCondition::UnanimousAgree), VoteOutcome::Passed);
    }

    #[test]
    fn counts_ballots_by_decision() {
        let ballot = |voter: &str, decision| Ballot {
            vote: VoteId::new(1),
            voter: MemberId::new(voter),
            decision,
            cast_at: Timestamp::new(0),
        };
        let tally = Tally::from_ballots(&[
            ballot("a", Decision::Agree),
            ballot("b", Decision::Disagree),
            ballot("c", Decision::Agree),
        ]);
        assert_eq!(tally, t(2, 1));
        assert_eq!(tally.total(), 3);
    }

    proptest! {
        #[test]
        fn unanimous_pass_implies_majority_pass(agree in 0u32..1000, disagree in 0u32..1000) {
            let tally = t(agree, disagree);
            if tally.passes(PassCondition::UnanimousAgree) {
                prop_assert!(tally.passes(PassCondition::Majority));
            }
        }

        #[test]
        fn majority_is_strict(n in 0u32..1000) {
            prop_assert!(!t(n, n).passes(PassCondition::Majority));
        }
    }
}
