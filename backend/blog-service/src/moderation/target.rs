use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Kind of entity a report or mute points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[sqlx(type_name = "moderation_target")]
pub enum TargetType {
    User,
    Comment,
    Reply,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "User",
            TargetType::Comment => "Comment",
            TargetType::Reply => "Reply",
        }
    }

    /// Attach an id to this kind
    pub fn with_id(self, id: Uuid) -> Target {
        match self {
            TargetType::User => Target::User(id),
            TargetType::Comment => Target::Comment(id),
            TargetType::Reply => Target::Reply(id),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(TargetType::User),
            "comment" => Ok(TargetType::Comment),
            "reply" => Ok(TargetType::Reply),
            _ => Err(AppError::BadRequest(format!(
                "Invalid targetType: {}. Must be one of 'User', 'Comment', or 'Reply'",
                raw
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for TargetType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: AppError| match e {
            AppError::BadRequest(msg) => serde::de::Error::custom(msg),
            other => serde::de::Error::custom(other.to_string()),
        })
    }
}

/// A typed reference to a reportable or mutable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    User(Uuid),
    Comment(Uuid),
    Reply(Uuid),
}

impl Target {
    /// Recombine the `(target_type, target_id)` storage columns
    pub fn from_parts(target_type: TargetType, id: Uuid) -> Self {
        target_type.with_id(id)
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            Target::User(_) => TargetType::User,
            Target::Comment(_) => TargetType::Comment,
            Target::Reply(_) => TargetType::Reply,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Target::User(id) | Target::Comment(id) | Target::Reply(id) => *id,
        }
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Target", 2)?;
        s.serialize_field("targetType", &self.target_type())?;
        s.serialize_field("targetId", &self.id())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        for raw in ["comment", "Comment", "COMMENT", " comment "] {
            assert_eq!(raw.parse::<TargetType>().unwrap(), TargetType::Comment);
        }
        assert_eq!("reply".parse::<TargetType>().unwrap(), TargetType::Reply);
        assert_eq!("USER".parse::<TargetType>().unwrap(), TargetType::User);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "Post".parse::<TargetType>().unwrap_err();
        assert_eq!(
            err,
            AppError::BadRequest(
                "Invalid targetType: Post. Must be one of 'User', 'Comment', or 'Reply'".into()
            )
        );
    }

    #[test]
    fn test_deserialize_normalizes_case() {
        let parsed: TargetType = serde_json::from_str("\"rEpLy\"").unwrap();
        assert_eq!(parsed, TargetType::Reply);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"Reply\"");
    }

    #[test]
    fn test_target_round_trips_through_parts() {
        let id = Uuid::new_v4();
        let target = Target::Comment(id);
        assert_eq!(
            Target::from_parts(target.target_type(), target.id()),
            target
        );
        let json = serde_json::to_value(target).unwrap();
        assert_eq!(json["targetType"], "Comment");
        assert_eq!(json["targetId"], id.to_string());
    }
}
