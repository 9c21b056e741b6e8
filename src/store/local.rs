use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use rocket::serde::json::serde_json;
use rocket::tokio::{self, fs, sync::Mutex};

use crate::error::{Error, Result};
use crate::model::election::{ElectionState, Vote, VotingStatus};

use super::{Backend, ElectionStore, Listener, Listeners, ResetOutcome, Subscription};

/// Key under which the whole election is stored as a single JSON blob.
pub const STORAGE_KEY: &str = "carnival_voting_app_data_v1";

/// Fallback store used when no database is configured.
///
/// All operations are serialised through one lock, so check-then-write
/// sequences cannot interleave. If a directory is given, every change is
/// mirrored to `<dir>/<STORAGE_KEY>.json` and reloaded on the next start.
pub struct LocalStore {
    state: Arc<Mutex<ElectionState>>,
    path: Option<PathBuf>,
    listeners: Listeners,
}

impl LocalStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(ElectionState::default())),
            path: None,
            listeners: Listeners::default(),
        }
    }

    /// Open the store file in the given directory, starting from the initial
    /// state if it doesn't exist yet.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = Self::blob_path(dir);
        let state = Self::load(&path).await?;
        info!(
            "Loaded local election store from {} ({}, {} votes)",
            path.display(),
            state.status,
            state.votes.len()
        );
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            path: Some(path),
            listeners: Listeners::default(),
        })
    }

    /// Location of the store file inside `dir`.
    pub fn blob_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!("{STORAGE_KEY}.json"))
    }

    /// Read a store file, treating a missing file as the initial state.
    pub async fn load(path: &Path) -> Result<ElectionState> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ElectionState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `new_state` (if file-backed), swap it in, and notify listeners.
    async fn commit(&self, current: &mut ElectionState, new_state: ElectionState) -> Result<()> {
        if let Some(path) = &self.path {
            // Write then rename, so a crash never leaves a half-written blob.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, serde_json::to_vec_pretty(&new_state)?).await?;
            fs::rename(&tmp, path).await?;
        }
        *current = new_state;
        self.listeners.notify(current);
        Ok(())
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[rocket::async_trait]
impl ElectionStore for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    async fn read_state(&self) -> Result<ElectionState> {
        Ok(self.state.lock().await.clone())
    }

    async fn write_status(&self, status: VotingStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.status == status {
            return Ok(());
        }
        let new_state = ElectionState {
            status,
            votes: state.votes.clone(),
        };
        self.commit(&mut state, new_state).await
    }

    async fn record_vote(&self, vote: &Vote) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.has_voted(&vote.voter_id) {
            return Err(Error::AlreadyVoted);
        }
        let mut new_state = state.clone();
        new_state.votes.push(vote.clone());
        self.commit(&mut state, new_state).await
    }

    async fn reset(&self) -> Result<ResetOutcome> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, ElectionState::default()).await?;
        Ok(ResetOutcome::Complete)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let subscription = self.listeners.register(listener.clone());
        // Deliver the current state. Holding the lock while doing so keeps it
        // ordered before any later change notification.
        match self.state.try_lock() {
            Ok(state) => listener(state.clone()),
            Err(_) => {
                let state = self.state.clone();
                tokio::spawn(async move {
                    let state = state.lock().await;
                    listener(state.clone());
                });
            }
        }
        subscription
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    fn recording_listener() -> (Arc<StdMutex<Vec<ElectionState>>>, Listener) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let listener_seen = seen.clone();
        let listener: Listener = Arc::new(move |state| listener_seen.lock().unwrap().push(state));
        (seen, listener)
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ponta-firme-{}", rand::random::<u32>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[rocket::async_test]
    async fn duplicate_votes_are_rejected() {
        let store = LocalStore::in_memory();
        store
            .record_vote(&Vote::new("andreia", "augusto"))
            .await
            .unwrap();
        let err = store
            .record_vote(&Vote::new("andreia", "berin"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        let state = store.read_state().await.unwrap();
        assert_eq!(state.votes.len(), 1);
        assert_eq!(state.votes[0].candidate_id, "augusto");
    }

    #[rocket::async_test]
    async fn status_writes_are_idempotent() {
        let store = LocalStore::in_memory();
        let (seen, listener) = recording_listener();
        let _subscription = store.subscribe(listener);

        store.write_status(VotingStatus::Open).await.unwrap();
        store.write_status(VotingStatus::Open).await.unwrap();

        assert_eq!(store.read_state().await.unwrap().status, VotingStatus::Open);
        // Initial snapshot plus exactly one change.
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn listeners_see_every_change() {
        let store = LocalStore::in_memory();
        let (seen, listener) = recording_listener();
        let subscription = store.subscribe(listener);

        store.write_status(VotingStatus::Open).await.unwrap();
        store
            .record_vote(&Vote::new("andreia", "augusto"))
            .await
            .unwrap();
        subscription.unsubscribe();
        store.write_status(VotingStatus::Closed).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], ElectionState::default());
        assert_eq!(seen[1].status, VotingStatus::Open);
        assert!(seen[1].votes.is_empty());
        assert_eq!(seen[2].votes.len(), 1);
    }

    #[rocket::async_test]
    async fn reset_clears_everything() {
        let store = LocalStore::in_memory();
        store.write_status(VotingStatus::Open).await.unwrap();
        for voter in ["a", "b", "c"] {
            store.record_vote(&Vote::new(voter, "d")).await.unwrap();
        }
        store.write_status(VotingStatus::Closed).await.unwrap();

        assert_eq!(store.reset().await.unwrap(), ResetOutcome::Complete);
        assert_eq!(store.read_state().await.unwrap(), ElectionState::default());
    }

    #[rocket::async_test]
    async fn file_backed_state_survives_reopen() {
        log4rs_test_utils::test_logging::init_logging_once_for(["ponta_firme_backend"], None, None);
        let dir = temp_dir();

        {
            let store = LocalStore::open(&dir).await.unwrap();
            store.write_status(VotingStatus::Open).await.unwrap();
            store
                .record_vote(&Vote::new("andreia", "augusto"))
                .await
                .unwrap();
        }

        let store = LocalStore::open(&dir).await.unwrap();
        let state = store.read_state().await.unwrap();
        assert_eq!(state.status, VotingStatus::Open);
        assert_eq!(state.votes.len(), 1);
        assert!(state.has_voted("andreia"));

        // The blob uses the documented shape.
        let raw = std::fs::read_to_string(LocalStore::blob_path(&dir)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["votes"][0]["voterId"], "andreia");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[rocket::async_test]
    async fn missing_file_is_initial_state() {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).await.unwrap();
        assert_eq!(store.read_state().await.unwrap(), ElectionState::default());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[rocket::async_test]
    async fn corrupt_file_is_reported() {
        let dir = temp_dir();
        std::fs::write(LocalStore::blob_path(&dir), "not json").unwrap();
        let result = LocalStore::open(&dir).await;
        assert!(matches!(result, Err(Error::Format(_))));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
