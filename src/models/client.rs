use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a customer that shoots are produced for
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::clients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Client {
    /// Unique identifier for the client (UUID v4 as string)
    id: String,

    /// The user who manages this client
    user_id: String,

    /// The client's name
    name: String,

    /// Where to reach the client
    contact_email: Option<String>,

    /// Free-form notes
    notes: Option<String>,

    /// When this client was created
    created_at: NaiveDateTime,

    /// When this client was last modified
    updated_at: NaiveDateTime,
}

impl Client {
    /// Creates a new client owned by `user_id`
    pub fn new(user_id: String, name: String, contact_email: Option<String>, notes: Option<String>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            contact_email,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn get_contact_email(&self) -> Option<String> {
        self.contact_email.clone()
    }

    pub fn set_contact_email(&mut self, contact_email: Option<String>) {
        self.contact_email = contact_email;
    }

    pub fn get_notes(&self) -> Option<String> {
        self.notes.clone()
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Bumps the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }
}
