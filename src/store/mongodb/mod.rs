//! MongoDB backed election store.
//!
//! The status lives in a single document of the `config` collection; each
//! vote is a document of the `votes` collection whose `_id` is the voter ID,
//! so the database itself refuses a second vote from the same voter.

use std::time::Duration;

use log::{debug, info, warn};
use mongodb::{
    bson::doc,
    options::{ClientOptions, UpdateOptions},
    Client, Database,
};
use rocket::futures::{StreamExt, TryStreamExt};
use rocket::tokio::{self, time::MissedTickBehavior};

use crate::error::{Error, Result};
use crate::model::election::{ElectionState, Vote, VotingStatus};

use super::{Backend, ElectionStore, Listener, ResetOutcome, Subscription};

mod collection;
mod errors;

pub use collection::{Coll, MongoCollection, StatusRecord, VoteRecord, METADATA_ID};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    poll_interval: Duration,
}

impl MongoStore {
    /// Connect to the given database and check that it answers.
    pub async fn connect(uri: &str, db_name: &str, poll_interval: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("ponta-firme-backend".to_string());
        let client = Client::with_options(options)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(Self::new(db, poll_interval))
    }

    pub fn new(db: Database, poll_interval: Duration) -> Self {
        Self { db, poll_interval }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn statuses(&self) -> Coll<StatusRecord> {
        Coll::from_db(&self.db)
    }

    fn votes(&self) -> Coll<VoteRecord> {
        Coll::from_db(&self.db)
    }

    /// Read the state and hand it to the listener if it differs from `last`.
    /// Returns the newest state known.
    async fn refresh(
        &self,
        listener: &Listener,
        last: Option<ElectionState>,
    ) -> Option<ElectionState> {
        match self.read_state().await {
            Ok(state) => {
                if last.as_ref() != Some(&state) {
                    listener(state.clone());
                }
                Some(state)
            }
            Err(e) => {
                warn!("Failed to refresh election state: {e}");
                last
            }
        }
    }

    /// Follow the change streams of both collections until one of them ends
    /// or fails. Change streams need a replica set; on a standalone server
    /// opening them fails straight away.
    async fn follow_changes(
        &self,
        listener: &Listener,
        last: &mut Option<ElectionState>,
    ) -> Result<()> {
        let mut statuses = Box::pin(self.statuses().watch(None, None).await?);
        let mut votes = Box::pin(self.votes().watch(None, None).await?);
        debug!("Following election change streams");

        loop {
            // The two streams are independent: a status change may be seen
            // before or after a concurrent vote.
            let event = tokio::select! {
                event = statuses.next() => event.map(|e| e.map(|_| ())),
                event = votes.next() => event.map(|e| e.map(|_| ())),
            };
            match event {
                Some(Ok(())) => *last = self.refresh(listener, last.take()).await,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            }
        }
    }

    /// Deliver state changes to the listener forever.
    async fn watch(self, listener: Listener) {
        let mut last = self.refresh(&listener, None).await;

        match self.follow_changes(&listener, &mut last).await {
            Ok(()) => warn!("Election change stream closed"),
            Err(e) => warn!("Election change streams unavailable: {e}"),
        }

        info!(
            "Polling election state every {}ms",
            self.poll_interval.as_millis()
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            last = self.refresh(&listener, last).await;
        }
    }
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    fn backend(&self) -> Backend {
        Backend::MongoDb
    }

    async fn read_state(&self) -> Result<ElectionState> {
        let status = self
            .statuses()
            .find_one(doc! { "_id": METADATA_ID }, None)
            .await?
            .map(|record| record.status)
            .unwrap_or_default();
        let votes = self
            .votes()
            .find(None, None)
            .await?
            .map_ok(|record| record.vote)
            .try_collect()
            .await?;
        Ok(ElectionState { status, votes })
    }

    async fn write_status(&self, status: VotingStatus) -> Result<()> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.statuses()
            .update_one(
                doc! { "_id": METADATA_ID },
                doc! { "$set": { "status": status } },
                options,
            )
            .await?;
        Ok(())
    }

    async fn record_vote(&self, vote: &Vote) -> Result<()> {
        let record = VoteRecord::from(vote.clone());
        match self.votes().insert_one(record, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::AlreadyVoted),
            Err(e) => Err(e.into()),
        }
    }

    async fn reset(&self) -> Result<ResetOutcome> {
        self.write_status(VotingStatus::Waiting).await?;
        match self.votes().delete_many(doc! {}, None).await {
            Ok(result) => {
                info!("Deleted {} votes", result.deleted_count);
                Ok(ResetOutcome::Complete)
            }
            Err(e) => {
                warn!("Election status reset, but votes could not be deleted: {e}");
                Ok(ResetOutcome::StatusOnly {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let store = self.clone();
        let task = tokio::spawn(store.watch(listener));
        Subscription::new(move || task.abort())
    }
}
