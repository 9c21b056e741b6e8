use serde::{Deserialize, Serialize};

use crate::model::{
    election::{ElectionState, Vote, VotingStatus},
    roster::Roster,
    tally::CandidateTally,
};
use crate::store::Backend;

/// What everyone may know about the election: its status and how many have
/// voted, but not who voted for whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub status: VotingStatus,
    pub vote_count: usize,
}

impl From<&ElectionState> for StateSnapshot {
    fn from(state: &ElectionState) -> Self {
        Self {
            status: state.status,
            vote_count: state.votes.len(),
        }
    }
}

/// Full view of the election for the admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStateDesc {
    pub status: VotingStatus,
    pub vote_count: usize,
    pub votes: Vec<Vote>,
    pub backend: Backend,
}

impl AdminStateDesc {
    pub fn new(state: ElectionState, backend: Backend) -> Self {
        Self {
            status: state.status,
            vote_count: state.votes.len(),
            votes: state.votes,
            backend,
        }
    }
}

/// Whether the logged-in participant has voted, and for whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusDesc {
    pub has_voted: bool,
    pub candidate_id: Option<String>,
}

impl VoteStatusDesc {
    pub fn for_voter(state: &ElectionState, voter_id: &str) -> Self {
        let vote = state.vote_of(voter_id);
        Self {
            has_voted: vote.is_some(),
            candidate_id: vote.map(|v| v.candidate_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub candidate_id: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct StatusChange {
    pub status: VotingStatus,
}

/// One line of the results, with the candidate's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub candidate_id: String,
    pub name: String,
    pub count: u64,
}

impl ResultEntry {
    pub fn from_tally(tally: Vec<CandidateTally>, roster: &Roster) -> Vec<Self> {
        tally
            .into_iter()
            .map(|t| Self {
                name: roster.display_name(&t.candidate_id).to_string(),
                candidate_id: t.candidate_id,
                count: t.count,
            })
            .collect()
    }
}
