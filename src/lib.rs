#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
#[cfg(test)]
use crate::service::ElectionService;

mod api;
pub mod config;
pub mod error;
mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::Config;

/// Build the server, picking the election store from configuration.
pub fn build() -> Rocket<Build> {
    base(rocket::build()).attach(StoreFairing)
}

fn base(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
}

/// A server with fixed test configuration over the given service.
#[cfg(test)]
pub(crate) fn test_rocket(service: ElectionService) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "a very secret test secret"))
        .merge(("auth_ttl", 3600))
        .merge(("admin_code", config::EXAMPLE_ADMIN_CODE))
        .merge(("log_level", "off"));
    base(rocket::custom(figment)).manage(service)
}
