pub mod api;
pub mod auth;
pub mod election;
pub mod roster;
pub mod tally;
