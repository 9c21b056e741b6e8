use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    election::{ElectionState, Vote, VotingStatus},
    roster::Roster,
    tally::{tally, CandidateTally},
};
use crate::store::{Backend, ElectionStore, ResetOutcome, Subscription};

/// The election rules, applied on top of whichever store is active.
///
/// Cheap to clone; every clone shares the same store.
#[derive(Clone)]
pub struct ElectionService {
    store: Arc<dyn ElectionStore>,
    roster: Arc<Roster>,
}

impl ElectionService {
    pub fn new(store: Arc<dyn ElectionStore>, roster: Roster) -> Self {
        Self {
            store,
            roster: Arc::new(roster),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    pub async fn state(&self) -> Result<ElectionState> {
        self.store.read_state().await
    }

    /// Record a vote from `voter_id` for `candidate_id`.
    ///
    /// Voting must be open, checked before anything else. Both IDs must be on
    /// the roster, nobody may vote for themselves, and the voter must not have
    /// voted yet.
    pub async fn cast_vote(&self, voter_id: &str, candidate_id: &str) -> Result<Vote> {
        let state = self.store.read_state().await?;
        if state.status != VotingStatus::Open {
            debug!("Rejected vote from {voter_id}: voting is {}", state.status);
            return Err(Error::VotingNotOpen);
        }

        for id in [voter_id, candidate_id] {
            if !self.roster.contains(id) {
                return Err(Error::UnknownParticipant(id.to_string()));
            }
        }
        if voter_id == candidate_id {
            return Err(Error::SelfVote);
        }
        if state.has_voted(voter_id) {
            debug!("Rejected repeat vote from {voter_id}");
            return Err(Error::AlreadyVoted);
        }

        // The store's keyed insert settles races between concurrent attempts.
        let vote = Vote::new(voter_id, candidate_id);
        self.store.record_vote(&vote).await?;
        info!("Recorded vote from {voter_id}");
        Ok(vote)
    }

    /// Set the election status.
    ///
    /// Any transition is accepted here; restricting admins to the sensible
    /// ones is up to the caller.
    pub async fn set_status(&self, status: VotingStatus) -> Result<()> {
        self.store.write_status(status).await?;
        info!("Election status set to {status}");
        Ok(())
    }

    /// Throw away every vote and go back to waiting. Irreversible.
    pub async fn reset_election(&self) -> Result<ResetOutcome> {
        let outcome = self.store.reset().await?;
        match &outcome {
            ResetOutcome::Complete => info!("Election reset"),
            ResetOutcome::StatusOnly { reason } => {
                warn!("Election only partially reset: {reason}")
            }
        }
        Ok(outcome)
    }

    /// Tally of the votes currently on record.
    pub async fn results(&self) -> Result<Vec<CandidateTally>> {
        let state = self.store.read_state().await?;
        Ok(tally(&state.votes))
    }

    /// Receive the current state now, and again after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ElectionState) + Send + Sync + 'static,
    {
        self.store.subscribe(Arc::new(listener))
    }
}
