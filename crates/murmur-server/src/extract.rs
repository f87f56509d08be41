// SPDX-License-Identifier: Apache-2.0

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use murmur_model::User;

pub const LOGIN_PATH: &str = "/auth/login/";

/// Identity resolved by the middleware, carried in request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: Option<User>,
}

/// The requester, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<AuthContext>()
                .and_then(|ctx| ctx.user.clone()),
        ))
    }
}

/// The authenticated gate: short-circuits anonymous requesters to the login
/// flow, preserving the original destination, and hands the resolved user
/// to the handler otherwise.
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthContext>()
            .and_then(|ctx| ctx.user.clone());
        match user {
            Some(user) => Ok(Self(user)),
            None => Err(Redirect::to(&format!(
                "{LOGIN_PATH}?next={}",
                parts.uri.path()
            ))),
        }
    }
}
