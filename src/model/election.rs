use std::fmt::{Display, Formatter};

use chrono::Utc;
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the voting lifecycle.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VotingStatus {
    /// The admin hasn't opened voting yet.
    #[default]
    Waiting,
    /// Votes are being accepted.
    Open,
    /// Voting finished, results are visible.
    Closed,
}

impl VotingStatus {
    /// Whether the admin surface offers a move from `self` to `target`.
    ///
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(self, target: VotingStatus) -> bool {
        use VotingStatus::*;
        matches!(
            (self, target),
            (Waiting, Waiting)
                | (Open, Open)
                | (Closed, Closed)
                | (Waiting, Open)
                | (Open, Waiting)
                | (Open, Closed)
                | (Closed, Waiting)
        )
    }
}

impl Display for VotingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Waiting => "WAITING",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        };
        write!(f, "{name}")
    }
}

impl From<VotingStatus> for Bson {
    fn from(status: VotingStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// A single ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: String,
    pub candidate_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Vote {
    /// Create a vote stamped with the current instant.
    pub fn new(voter_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            candidate_id: candidate_id.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Everything there is to know about the current election.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionState {
    pub status: VotingStatus,
    pub votes: Vec<Vote>,
}

impl ElectionState {
    /// The vote cast by the given voter, if any.
    pub fn vote_of(&self, voter_id: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.voter_id == voter_id)
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.vote_of(voter_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json::{self, json};

    use super::*;

    #[test]
    fn exposed_transitions() {
        use VotingStatus::*;
        assert!(Waiting.can_transition_to(Open));
        assert!(Open.can_transition_to(Waiting));
        assert!(Open.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Waiting));
        assert!(Open.can_transition_to(Open));

        assert!(!Waiting.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Open));
    }

    #[test]
    fn persisted_shape() {
        let state = ElectionState {
            status: VotingStatus::Open,
            votes: vec![Vote {
                voter_id: "andreia".to_string(),
                candidate_id: "augusto".to_string(),
                timestamp: 1_700_000_000_000,
            }],
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "status": "OPEN",
                "votes": [{
                    "voterId": "andreia",
                    "candidateId": "augusto",
                    "timestamp": 1_700_000_000_000_i64,
                }],
            })
        );
    }

    #[test]
    fn initial_state() {
        let state = ElectionState::default();
        assert_eq!(state.status, VotingStatus::Waiting);
        assert!(state.votes.is_empty());
        assert!(!state.has_voted("andreia"));
    }
}
