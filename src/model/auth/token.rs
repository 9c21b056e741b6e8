use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, GuardFailure, Result};
use crate::service::ElectionService;

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific rights.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    id: String,
    #[serde(rename = "rgt")]
    rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// The ID of the logged-in user.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given user, with the correct rights for that user type.
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that it has the correct rights for this user
    /// type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match Self::verify(req).await {
            Ok(token) => Outcome::Success(token),
            Err(e) => {
                // Leave the reason for the 401 catcher.
                req.local_cache(|| GuardFailure(e.to_string()));
                Outcome::Failure((Status::Unauthorized, e))
            }
        }
    }
}

impl<U> AuthToken<U>
where
    U: User + Send,
{
    async fn verify(req: &Request<'_>) -> Result<Self> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = req
            .cookies()
            .get(AUTH_TOKEN_COOKIE)
            .ok_or_else(|| Error::Unauthorized("not logged in".to_string()))?;

        // Decode the token.
        let token = Self::from_cookie(cookie, config)?;

        // Check it represents the correct rights.
        if !token.permits(U::RIGHTS) {
            return Err(Error::Unauthorized(format!("{} rights required", U::RIGHTS)));
        }

        // Check a participant is still on the roster.
        if token.rights == Rights::Participant {
            // Managed alongside `Config`.
            let service = req.guard::<&State<ElectionService>>().await.unwrap();
            if !service.roster().contains(&token.id) {
                return Err(Error::Unauthorized(format!(
                    "unknown participant {}",
                    token.id
                )));
            }
        }

        Ok(token)
    }
}
