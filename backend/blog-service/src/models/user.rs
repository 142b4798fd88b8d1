use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]{3,15}$").expect("hardcoded username regex is invalid")
});

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Columns selected whenever a full `User` row is loaded
pub const USER_COLUMNS: &str = "id, name, username, email, password_hash, phone, date_of_birth, \
     country, bio, about, image, banner, role, is_active, is_soft_banned, soft_ban_expires, \
     password_changed_at, password_reset_token, password_reset_expires, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub bio: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_soft_banned: bool,
    pub soft_ban_expires: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the password changed after a token issued at `iat` (unix seconds)
    pub fn changed_password_after(&self, iat: i64) -> bool {
        self.password_changed_at
            .map(|changed| iat < changed.timestamp())
            .unwrap_or(false)
    }

    /// A soft ban whose expiry has passed is lifted on the next request
    pub fn soft_ban_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_soft_banned && self.soft_ban_expires.map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }

    pub fn details(&self) -> UserDetails {
        UserDetails::from(self)
    }
}

/// User as returned by profile and admin endpoints
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub bio: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_soft_banned: bool,
    pub soft_ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            date_of_birth: u.date_of_birth,
            country: u.country.clone(),
            bio: u.bio.clone(),
            about: u.about.clone(),
            image: u.image.clone(),
            banner: u.banner.clone(),
            role: u.role,
            is_active: u.is_active,
            is_soft_banned: u.is_soft_banned,
            soft_ban_expires: u.soft_ban_expires,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Session payload: the profile without the role, which is sent alongside
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub bio: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
    pub is_active: bool,
    pub is_soft_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserDetails {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            date_of_birth: u.date_of_birth,
            country: u.country.clone(),
            bio: u.bio.clone(),
            about: u.about.clone(),
            image: u.image.clone(),
            banner: u.banner.clone(),
            is_active: u.is_active,
            is_soft_banned: u.is_soft_banned,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Minimal author info embedded in posts, comments and replies
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
}

/// Registrations per calendar month
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct MonthlyStat {
    #[serde(rename = "_id")]
    pub month: i32,
    pub total: i64,
}

pub fn validate_username(username: &str) -> Result<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Username must be 3-15 characters and contain only letters, numbers and underscores"
                .to_string(),
        ))
    }
}

/// At least 8 characters drawn from letters, digits and `@$!%*?&`, with one
/// of each of lowercase, uppercase, digit and special
pub fn validate_password_strength(password: &str) -> Result<()> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let strong = password.chars().count() >= 8
        && allowed
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Password must contain at least one uppercase letter, one lowercase letter, one number and one special character"
                .to_string(),
        ))
    }
}

pub fn validate_password_pair(password: &str, confirm: &str) -> Result<()> {
    let len = password.chars().count();
    if !(8..=32).contains(&len) {
        return Err(AppError::BadRequest(
            "Password must be between 8 and 32 characters long".to_string(),
        ));
    }
    validate_password_strength(password)?;
    if password != confirm {
        return Err(AppError::BadRequest("Passwords are not the same".to_string()));
    }
    Ok(())
}
