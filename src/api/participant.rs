use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{CastVoteRequest, VoteStatusDesc},
        auth::AuthToken,
        election::Vote,
        roster::Participant,
    },
    service::ElectionService,
};

pub fn routes() -> Vec<Route> {
    routes![me, candidates, vote_status, cast_vote]
}

/// Look up the participant behind a token.
fn participant_by_token<'a>(
    token: &AuthToken<Participant>,
    service: &'a ElectionService,
) -> Result<&'a Participant> {
    service
        .roster()
        .get(token.id())
        .ok_or_else(|| Error::UnknownParticipant(token.id().to_string()))
}

#[get("/participant/me")]
fn me(
    token: AuthToken<Participant>,
    service: &State<ElectionService>,
) -> Result<Json<Participant>> {
    let participant = participant_by_token(&token, service)?;
    Ok(Json(participant.clone()))
}

/// Everyone the logged-in participant may vote for.
#[get("/participant/candidates")]
fn candidates(
    token: AuthToken<Participant>,
    service: &State<ElectionService>,
) -> Json<Vec<Participant>> {
    let candidates = service
        .roster()
        .candidates_for(token.id())
        .cloned()
        .collect();
    Json(candidates)
}

#[get("/participant/vote")]
async fn vote_status(
    token: AuthToken<Participant>,
    service: &State<ElectionService>,
) -> Result<Json<VoteStatusDesc>> {
    let state = service.state().await?;
    Ok(Json(VoteStatusDesc::for_voter(&state, token.id())))
}

#[post("/participant/vote", data = "<request>", format = "json")]
async fn cast_vote(
    token: AuthToken<Participant>,
    request: Json<CastVoteRequest>,
    service: &State<ElectionService>,
) -> Result<Json<Vote>> {
    let vote = service.cast_vote(token.id(), &request.candidate_id).await?;
    Ok(Json(vote))
}
