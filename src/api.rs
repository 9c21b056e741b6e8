use rocket::Route;

mod admin;
pub(crate) mod auth;
mod participant;
mod public;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(auth::routes());
    routes.extend(participant::routes());
    routes
}
