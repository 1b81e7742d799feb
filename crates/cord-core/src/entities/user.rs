//! User entity

use crate::value_objects::Snowflake;
use serde::{Deserialize, Serialize};

/// A platform user as it appears in READY and message payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Name to show in logs and replies
    ///
    /// Prefers the global display name, falls back to the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Legacy `name#1234` tag, or just the username for migrated accounts
    #[must_use]
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{d}", self.username),
            _ => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserialize_minimal() {
        let user: User = serde_json::from_str(r#"{"id":"80351110224678912","username":"nelly"}"#).unwrap();
        assert_eq!(user.id, Snowflake::new(80_351_110_224_678_912));
        assert!(!user.bot);
        assert_eq!(user.display_name(), "nelly");
        assert_eq!(user.tag(), "nelly");
    }

    #[test]
    fn test_user_tag() {
        let user = User {
            id: Snowflake::new(1),
            username: "nelly".to_string(),
            discriminator: Some("1337".to_string()),
            global_name: Some("Nelly".to_string()),
            bot: false,
        };
        assert_eq!(user.tag(), "nelly#1337");
        assert_eq!(user.display_name(), "Nelly");
    }
}
