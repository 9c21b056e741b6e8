use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{AdminStateDesc, ResultEntry, StatusChange},
        auth::{Admin, AuthToken},
    },
    service::ElectionService,
    store::ResetOutcome,
};

pub fn routes() -> Vec<Route> {
    routes![get_state, set_status, reset_election, get_results]
}

#[get("/admin/state")]
async fn get_state(
    _token: AuthToken<Admin>,
    service: &State<ElectionService>,
) -> Result<Json<AdminStateDesc>> {
    let state = service.state().await?;
    Ok(Json(AdminStateDesc::new(state, service.backend())))
}

/// Move the election to a new status. Only the transitions the admin panel
/// offers are accepted.
#[put("/admin/status", data = "<change>", format = "json")]
async fn set_status(
    _token: AuthToken<Admin>,
    change: Json<StatusChange>,
    service: &State<ElectionService>,
) -> Result<Json<AdminStateDesc>> {
    let current = service.state().await?.status;
    if !current.can_transition_to(change.status) {
        return Err(Error::BadRequest(format!(
            "Cannot move the election from {current} to {}",
            change.status
        )));
    }

    service.set_status(change.status).await?;

    let state = service.state().await?;
    Ok(Json(AdminStateDesc::new(state, service.backend())))
}

/// Wipe every vote and return to waiting. Must be confirmed explicitly.
#[delete("/admin/election?<confirm>")]
async fn reset_election(
    _token: AuthToken<Admin>,
    confirm: Option<bool>,
    service: &State<ElectionService>,
) -> Result<Json<ResetOutcome>> {
    if confirm != Some(true) {
        return Err(Error::BadRequest(
            "Resetting the election must be confirmed with `confirm=true`".to_string(),
        ));
    }

    let outcome = service.reset_election().await?;
    Ok(Json(outcome))
}

/// Live results, visible to the admin at any status.
#[get("/admin/results")]
async fn get_results(
    _token: AuthToken<Admin>,
    service: &State<ElectionService>,
) -> Result<Json<Vec<ResultEntry>>> {
    let tally = service.results().await?;
    Ok(Json(ResultEntry::from_tally(tally, service.roster())))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::{model::election::VotingStatus, store::Backend};

    use super::*;

    async fn put_status(client: &Client, status: VotingStatus) -> Status {
        client
            .put(uri!(set_status))
            .header(ContentType::JSON)
            .body(json!({ "status": status }).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test]
    async fn requires_login(client: Client, service: ElectionService) {
        let response = client.get(uri!(get_state)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        assert_eq!(
            put_status(&client, VotingStatus::Open).await,
            Status::Unauthorized
        );

        let response = client
            .delete(uri!(reset_election(Some(true))))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        assert_eq!(service.state().await.unwrap().status, VotingStatus::Waiting);
    }

    #[backend_test]
    async fn rejections_are_json(client: Client) {
        let response = client.get(uri!(get_state)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(response.content_type(), Some(ContentType::JSON));
        assert_eq!(
            response.into_json::<Value>().await.unwrap(),
            json!({"error": "Unauthorized: not logged in"})
        );

        let response = client.get("/admin/nowhere").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(
            response.into_json::<Value>().await.unwrap(),
            json!({"error": "Not Found"})
        );
    }

    #[backend_test(participant)]
    async fn participant_rejection_names_rights(client: Client) {
        let response = client.get(uri!(get_state)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(
            response.into_json::<Value>().await.unwrap(),
            json!({"error": "Unauthorized: admin rights required"})
        );
    }

    #[backend_test(participant)]
    async fn participant_is_not_admin(client: Client, service: ElectionService) {
        assert_eq!(
            put_status(&client, VotingStatus::Open).await,
            Status::Unauthorized
        );
        let response = client.get(uri!(get_results)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(service.state().await.unwrap().status, VotingStatus::Waiting);
    }

    #[backend_test(admin)]
    async fn full_state(client: Client, service: ElectionService) {
        service.set_status(VotingStatus::Open).await.unwrap();
        service.cast_vote("andreia", "augusto").await.unwrap();

        let response = client.get(uri!(get_state)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let desc = response.into_json::<AdminStateDesc>().await.unwrap();
        assert_eq!(desc.status, VotingStatus::Open);
        assert_eq!(desc.vote_count, 1);
        assert_eq!(desc.votes[0].voter_id, "andreia");
        assert_eq!(desc.backend, Backend::Local);
    }

    #[backend_test(admin)]
    async fn status_transitions(client: Client, service: ElectionService) {
        // Closing before opening is not offered.
        assert_eq!(
            put_status(&client, VotingStatus::Closed).await,
            Status::BadRequest
        );
        assert_eq!(service.state().await.unwrap().status, VotingStatus::Waiting);

        assert_eq!(put_status(&client, VotingStatus::Open).await, Status::Ok);
        assert_eq!(service.state().await.unwrap().status, VotingStatus::Open);

        // Pausing keeps the votes.
        service.cast_vote("andreia", "augusto").await.unwrap();
        assert_eq!(put_status(&client, VotingStatus::Waiting).await, Status::Ok);
        assert_eq!(service.state().await.unwrap().votes.len(), 1);

        assert_eq!(put_status(&client, VotingStatus::Open).await, Status::Ok);
        assert_eq!(put_status(&client, VotingStatus::Closed).await, Status::Ok);
        assert_eq!(
            put_status(&client, VotingStatus::Open).await,
            Status::BadRequest
        );
        assert_eq!(service.state().await.unwrap().status, VotingStatus::Closed);
    }

    #[backend_test(admin)]
    async fn reset_needs_confirmation(client: Client, service: ElectionService) {
        service.set_status(VotingStatus::Open).await.unwrap();
        service.cast_vote("andreia", "augusto").await.unwrap();
        service.set_status(VotingStatus::Closed).await.unwrap();

        let response = client
            .delete(uri!(reset_election(None::<bool>)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client
            .delete(uri!(reset_election(Some(false))))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(service.state().await.unwrap().votes.len(), 1);

        let response = client
            .delete(uri!(reset_election(Some(true))))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_json::<ResetOutcome>().await.unwrap(),
            ResetOutcome::Complete
        );
        let state = service.state().await.unwrap();
        assert_eq!(state.status, VotingStatus::Waiting);
        assert!(state.votes.is_empty());
    }

    #[backend_test(admin)]
    async fn live_results(client: Client, service: ElectionService) {
        service.set_status(VotingStatus::Open).await.unwrap();
        service.cast_vote("andreia", "paula-do-jezer").await.unwrap();
        service.cast_vote("augusto", "berin").await.unwrap();
        service.cast_vote("berin", "paula-do-jezer").await.unwrap();

        let response = client.get(uri!(get_results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_json::<Vec<ResultEntry>>().await.unwrap(),
            vec![
                ResultEntry {
                    candidate_id: "paula-do-jezer".to_string(),
                    name: "Paula do Jezer".to_string(),
                    count: 2,
                },
                ResultEntry {
                    candidate_id: "berin".to_string(),
                    name: "Berin".to_string(),
                    count: 1,
                },
            ]
        );
    }
}
