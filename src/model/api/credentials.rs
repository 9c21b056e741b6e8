use serde::{Deserialize, Serialize};

/// A participant's login attempt.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLogin {
    pub participant_id: String,
    pub code: String,
}

/// The administrator's login attempt.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminLogin {
    pub code: String,
}
