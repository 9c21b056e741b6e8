//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Field names are camelCase.
//! - Participant codes never appear in responses.

pub mod credentials;
pub mod election;

pub use credentials::{AdminLogin, ParticipantLogin};
pub use election::{
    AdminStateDesc, CastVoteRequest, ResultEntry, StateSnapshot, StatusChange, VoteStatusDesc,
};
