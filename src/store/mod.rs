//! Persistence of the election state.
//!
//! Exactly one [`ElectionStore`] is active per running server: a MongoDB
//! backed store when a database is configured, or a [`LocalStore`] otherwise.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::election::{ElectionState, Vote, VotingStatus};

mod local;
pub mod mongodb;

pub use self::mongodb::MongoStore;
pub use local::{LocalStore, STORAGE_KEY};

/// A callback receiving every observed election state.
pub type Listener = Arc<dyn Fn(ElectionState) + Send + Sync>;

/// Which kind of store is backing the election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    MongoDb,
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// How much of a reset actually happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ResetOutcome {
    /// Status is back to waiting and all votes are gone.
    Complete,
    /// Status is back to waiting, but the votes could not be deleted.
    StatusOnly { reason: String },
}

/// Storage for the election status and the votes cast so far.
#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Read the current status and every vote.
    async fn read_state(&self) -> Result<ElectionState>;

    /// Set the election status. Writing the current status again is a no-op.
    async fn write_status(&self, status: VotingStatus) -> Result<()>;

    /// Store a vote, keyed by its voter.
    ///
    /// Fails with [`Error::AlreadyVoted`](crate::error::Error::AlreadyVoted)
    /// if the voter already has a vote on record.
    async fn record_vote(&self, vote: &Vote) -> Result<()>;

    /// Remove every vote and set the status back to waiting.
    async fn reset(&self) -> Result<ResetOutcome>;

    /// Register a listener for state changes. The listener is called once
    /// with the current state, then again after every observed change, until
    /// the returned [`Subscription`] is dropped or unsubscribed.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Handle on a registered listener.
///
/// Dropping the handle unsubscribes. A notification that is already being
/// delivered is not interrupted.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Default)]
struct ListenerMap {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

/// A registry of listeners that can be notified synchronously.
#[derive(Default, Clone)]
pub(crate) struct Listeners(Arc<Mutex<ListenerMap>>);

impl Listeners {
    /// Register a listener; the subscription removes it again.
    pub fn register(&self, listener: Listener) -> Subscription {
        let id = {
            let mut map = self.lock();
            let id = map.next_id;
            map.next_id += 1;
            map.listeners.insert(id, listener);
            id
        };
        let weak = Arc::downgrade(&self.0);
        Subscription::new(move || {
            if let Some(map) = weak.upgrade() {
                let mut map = map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                map.listeners.remove(&id);
            }
        })
    }

    /// Call every listener with the given state.
    ///
    /// Listeners are invoked outside the registry lock, so they may
    /// subscribe or unsubscribe freely.
    pub fn notify(&self, state: &ElectionState) {
        let listeners = self.lock().listeners.values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(state.clone());
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenerMap> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
