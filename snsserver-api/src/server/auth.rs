use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use snsserver_common::model::{
    auth::AuthToken,
    member::{Member, Username},
};
use snsserver_db::client::DbClient;
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The member a request's bearer token belongs to.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedMember {
    member: Member,
}

impl AuthenticatedMember {
    #[must_use]
    pub fn username(&self) -> &Username {
        &self.member.username
    }
}

impl<S> FromRequestParts<S> for AuthenticatedMember
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let authentication = Arc::<DbClient>::from_ref(state)
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.member.id != request_token.member_id
            || authentication.is_expired_at(UtcDateTime::now())
        {
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            member: authentication.member,
        })
    }
}
