use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const USERNAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MemberMarker;

/// An account known to the identity subsystem. Read-only from the post side.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Member {
    pub id: Id<MemberMarker>,
    pub username: Username,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0:?}")]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let len = username.chars().count();
        if (1..=USERNAME_MAX_LEN).contains(&len) {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::member::{USERNAME_MAX_LEN, Username};

    #[test]
    fn username_length_bounds() {
        assert!(Username::new(String::new()).is_err());
        assert!(Username::new("alice".to_owned()).is_ok());
        assert!(Username::new("ä".repeat(USERNAME_MAX_LEN)).is_ok());
        assert!(Username::new("a".repeat(USERNAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn username_rejected_while_deserializing() {
        assert!(serde_json::from_str::<Username>("\"bob\"").is_ok());
        assert!(serde_json::from_str::<Username>("\"\"").is_err());
    }
}
