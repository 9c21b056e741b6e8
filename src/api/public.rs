use rocket::{
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::{select, sync::mpsc},
    Route, Shutdown, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{ResultEntry, StateSnapshot},
        election::VotingStatus,
        roster::Participant,
        tally::tally,
    },
    service::ElectionService,
};

pub fn routes() -> Vec<Route> {
    routes![participants, state, events, results]
}

/// List participants, optionally only those whose name contains `search`.
#[get("/participants?<search>")]
fn participants(
    search: Option<&str>,
    service: &State<ElectionService>,
) -> Json<Vec<Participant>> {
    let roster = service.roster();
    let found = match search {
        Some(query) => roster.search(query).into_iter().cloned().collect(),
        None => roster.participants().to_vec(),
    };
    Json(found)
}

#[get("/state")]
async fn state(service: &State<ElectionService>) -> Result<Json<StateSnapshot>> {
    let state = service.state().await?;
    Ok(Json(StateSnapshot::from(&state)))
}

/// Stream a [`StateSnapshot`] now and after every change.
#[get("/events")]
fn events(service: &State<ElectionService>, mut shutdown: Shutdown) -> EventStream![] {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = service.subscribe(move |state| {
        // The receiver is gone once the client disconnects.
        let _ = tx.send(StateSnapshot::from(&state));
    });

    EventStream! {
        let _subscription = subscription;
        loop {
            let snapshot = select! {
                snapshot = rx.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&snapshot).event("state");
        }
    }
}

/// Final results, once voting has closed.
#[get("/results")]
async fn results(service: &State<ElectionService>) -> Result<Json<Vec<ResultEntry>>> {
    let state = service.state().await?;
    if state.status != VotingStatus::Closed {
        return Err(Error::BadRequest(
            "Results are only available once voting has closed".to_string(),
        ));
    }
    Ok(Json(ResultEntry::from_tally(
        tally(&state.votes),
        service.roster(),
    )))
}
