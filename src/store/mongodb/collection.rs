use std::ops::Deref;

use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use crate::model::election::{Vote, VotingStatus};

/// ID of the single document holding the election status.
pub const METADATA_ID: &str = "election_metadata";

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The election status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: VotingStatus,
}

/// A vote document, keyed by voter so each voter can only have one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub vote: Vote,
}

impl From<Vote> for VoteRecord {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.voter_id.clone(),
            vote,
        }
    }
}

impl Deref for VoteRecord {
    type Target = Vote;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

const CONFIG: &str = "config";
impl MongoCollection for StatusRecord {
    const NAME: &'static str = CONFIG;
}

const VOTES: &str = "votes";
impl MongoCollection for VoteRecord {
    const NAME: &'static str = VOTES;
}
