use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::{serde_json, Json, Value},
    Catcher, Request,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote store could not be reached or refused the operation.
    #[error("Election store unavailable: {0}")]
    Unavailable(#[from] DbError),
    #[error("Voting is not open")]
    VotingNotOpen,
    #[error("This participant has already voted")]
    AlreadyVoted,
    #[error("Participants cannot vote for themselves")]
    SelfVote,
    #[error("No participant with ID {0}")]
    UnknownParticipant(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// Reading or writing the local store file failed.
    #[error("Local store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The local store file could not be decoded.
    #[error("Malformed local store: {0}")]
    Format(#[from] serde_json::Error),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Self::Unavailable(_) => Status::ServiceUnavailable,
            Self::VotingNotOpen | Self::AlreadyVoted => Status::Conflict,
            Self::SelfVote | Self::BadRequest(_) => Status::BadRequest,
            Self::UnknownParticipant(_) => Status::NotFound,
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Io(_) | Self::Format(_) | Self::Argon2(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).respond_to(req)
    }
}

/// Why a request guard turned the request away, cached on the request.
#[derive(Debug, Clone)]
pub struct GuardFailure(pub String);

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    let reason = req.local_cache(|| GuardFailure("Unauthorized".to_string()));
    Json(serde_json::json!({ "error": reason.0 }))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<Value>) {
    let reason = status.reason().unwrap_or("Unknown error");
    (status, Json(serde_json::json!({ "error": reason })))
}

/// Catchers rendering guard and routing failures in the same JSON shape as
/// [`Error`].
pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, default_catcher]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_are_client_errors() {
        for err in [
            Error::VotingNotOpen,
            Error::AlreadyVoted,
            Error::SelfVote,
            Error::UnknownParticipant("nobody".to_string()),
            Error::Unauthorized("wrong code".to_string()),
        ] {
            assert!(err.status().class().is_client_error(), "{err}");
        }
    }

    #[test]
    fn conflicts() {
        assert_eq!(Error::VotingNotOpen.status(), Status::Conflict);
        assert_eq!(Error::AlreadyVoted.status(), Status::Conflict);
    }
}
