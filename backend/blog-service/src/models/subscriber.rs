use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscriber_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Pending,
    Confirmed,
    Unsubscribed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub status: SubscriberStatus,
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,
    #[serde(skip_serializing)]
    pub confirmation_token_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub unsubscribe_token: Option<String>,
    #[serde(skip_serializing)]
    pub unsubscribe_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which of the two emailed links a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Confirm,
    Unsubscribe,
}

impl Subscriber {
    /// Stored token for `purpose` matches and has not expired
    pub fn token_valid(&self, purpose: TokenPurpose, token: &str, now: DateTime<Utc>) -> bool {
        let (stored, expires) = match purpose {
            TokenPurpose::Confirm => (&self.confirmation_token, self.confirmation_token_expires),
            TokenPurpose::Unsubscribe => (&self.unsubscribe_token, self.unsubscribe_token_expires),
        };

        match (stored.as_deref(), expires) {
            (Some(stored), Some(expires)) => stored == token && expires > now,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscriber() -> Subscriber {
        let now = Utc::now();
        Subscriber {
            id: Uuid::new_v4(),
            email: "reader@example.com".into(),
            status: SubscriberStatus::Pending,
            confirmation_token: Some("abc".into()),
            confirmation_token_expires: Some(now + Duration::minutes(30)),
            unsubscribe_token: None,
            unsubscribe_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_validity() {
        let s = subscriber();
        let now = Utc::now();
        assert!(s.token_valid(TokenPurpose::Confirm, "abc", now));
        assert!(!s.token_valid(TokenPurpose::Confirm, "abd", now));
        assert!(!s.token_valid(TokenPurpose::Confirm, "abc", now + Duration::minutes(31)));
        assert!(!s.token_valid(TokenPurpose::Unsubscribe, "abc", now));
    }

    #[test]
    fn test_tokens_are_not_serialized() {
        let json = serde_json::to_value(subscriber()).unwrap();
        assert!(json.get("confirmationToken").is_none());
        assert_eq!(json["status"], "pending");
    }
}
