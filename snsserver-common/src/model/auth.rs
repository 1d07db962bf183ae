use crate::{
    model::{
        Id,
        member::{Member, MemberMarker},
    },
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid member id: {0}")]
    InvalidMemberId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Bearer token as handed out to a member: `<member id>:<base64 core>:<base64 salt>`.
///
/// Only the argon2 hash of the core is stored, so a leaked token table cannot be replayed.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub member_id: Id<MemberMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

/// A stored session, resolved to the member it authenticates.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub member: Member,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl AuthToken {
    /// Tokens are issued by the identity subsystem; this mints one for exercising the parser.
    #[cfg(test)]
    #[must_use]
    pub fn generate_random(member_id: Id<MemberMarker>) -> Self {
        Self {
            member_id,
            core: rand::random(),
            salt: rand::random(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn as_token_str(&self) -> String {
        use base64::display::Base64Display;

        let member_id = self.member_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{member_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let member_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let member_id = member_id_part
            .parse()
            .map_err(Self::Err::InvalidMemberId)?;
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            member_id,
            core,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("member_id", &self.member_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Vec<u8>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let boxed: Box<[u8]> = value.into_boxed_slice();
        Ok(Self(boxed.try_into().map_err(|_| InvalidAuthTokenHashError)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            auth::{AuthToken, AuthTokenDecodeError, Authentication},
            member::{Member, Username},
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_string_parses_back() {
        let token = AuthToken::generate_random(Id::new(7));
        let parsed: AuthToken = token.as_token_str().parse().unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            "7:abc".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            "seven:AAAA:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidMemberId(_))
        ));
        assert_eq!(
            "7:AAAA:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidCoreLength)
        );
    }

    #[test]
    fn authentication_expiry() {
        let token = AuthToken::generate_random(Id::new(1));
        let created_at = utc_datetime!(2025-06-01 12:00);
        let mut authentication = Authentication {
            member: Member {
                id: Id::new(1),
                username: Username::new("alice".to_owned()).unwrap(),
            },
            token_hash: token.hash().unwrap(),
            created_at,
            expires_after: None,
        };

        assert!(!authentication.is_expired_at(created_at + Duration::days(365)));

        authentication.expires_after = PositiveDuration::new(Duration::hours(1));
        assert!(!authentication.is_expired_at(created_at + Duration::minutes(59)));
        assert!(authentication.is_expired_at(created_at + Duration::minutes(61)));
    }
}
