use log::info;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{AdminLogin, ParticipantLogin},
        auth::{Admin, AuthToken, AUTH_TOKEN_COOKIE},
        roster::Participant,
    },
    service::ElectionService,
};

pub fn routes() -> Vec<Route> {
    routes![login, authenticate_admin, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<ParticipantLogin>,
    service: &State<ElectionService>,
    config: &State<Config>,
) -> Result<Json<Participant>> {
    let participant = service
        .roster()
        .get(&credentials.participant_id)
        .filter(|p| p.verify_code(&credentials.code))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No participant found with the provided name and code combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(participant);
    cookies.add(token.into_cookie(config)?);
    info!("{} logged in", participant.id);

    Ok(Json(participant.clone()))
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminLogin>,
    config: &State<Config>,
) -> Result<()> {
    if !config.verify_admin_code(&credentials.code)? {
        return Err(Error::Unauthorized("Incorrect admin code.".to_string()));
    }

    let token = AuthToken::new(&Admin);
    cookies.add(token.into_cookie(config)?);
    info!("Admin logged in");

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
