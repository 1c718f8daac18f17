use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// What a user is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Producer,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Producer => "producer",
            UserRole::Viewer => "viewer",
        }
    }

    /// Whether this role may create, change or delete records
    pub fn can_write(&self) -> bool {
        !matches!(self, UserRole::Viewer)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "producer" => Ok(UserRole::Producer),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(ParseEnumError::new("user role", other)),
        }
    }
}

/// Represents an account that owns clients and shoots
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    /// Unique identifier for the user (UUID v4 as string)
    id: String,

    /// Login email, unique across users
    email: String,

    /// Display name
    name: String,

    /// Stored role name, see [`UserRole`]
    role: String,

    /// When this user was created
    created_at: NaiveDateTime,
}

impl User {
    /// Creates a new user with the given role
    pub fn new(email: String, name: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            role: role.as_str().to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_email(&self) -> String {
        self.email.clone()
    }

    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    /// Gets the user's role, falling back to the least privileged role
    /// if the stored value is not recognised
    pub fn get_role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Viewer)
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }
}
