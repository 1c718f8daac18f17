use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Third-party services a user can connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationProvider {
    GoogleCalendar,
    GoogleDrive,
}

impl IntegrationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationProvider::GoogleCalendar => "google_calendar",
            IntegrationProvider::GoogleDrive => "google_drive",
        }
    }
}

impl fmt::Display for IntegrationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationProvider {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_calendar" => Ok(IntegrationProvider::GoogleCalendar),
            "google_drive" => Ok(IntegrationProvider::GoogleDrive),
            other => Err(ParseEnumError::new("integration provider", other)),
        }
    }
}

/// A stored OAuth connection between a user and a third-party service
///
/// Tokens are never serialized; API responses describe an integration with
/// [`Integration::status_json`] instead.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::integrations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Integration {
    id: String,
    user_id: String,
    provider: String,
    #[serde(skip_serializing)]
    access_token: String,
    #[serde(skip_serializing)]
    refresh_token: Option<String>,
    token_expires_at: Option<NaiveDateTime>,
    scope: Option<String>,
    calendar_id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl Integration {
    pub fn new(
        user_id: String,
        provider: IntegrationProvider,
        access_token: String,
        refresh_token: Option<String>,
        token_expires_at: Option<DateTime<Utc>>,
        scope: Option<String>,
        calendar_id: String,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            provider: provider.as_str().to_string(),
            access_token,
            refresh_token,
            token_expires_at: token_expires_at.map(|ts| ts.naive_utc()),
            scope,
            calendar_id,
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

    pub fn get_provider(&self) -> String {
        self.provider.clone()
    }

    pub fn get_access_token(&self) -> String {
        self.access_token.clone()
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    pub fn get_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expires_at
            .map(|ts| DateTime::from_naive_utc_and_offset(ts, Utc))
    }

    pub fn get_scope(&self) -> Option<String> {
        self.scope.clone()
    }

    pub fn get_calendar_id(&self) -> String {
        self.calendar_id.clone()
    }

    pub fn set_calendar_id(&mut self, calendar_id: String) {
        self.calendar_id = calendar_id;
    }

    pub fn set_scope(&mut self, scope: Option<String>) {
        self.scope = scope;
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Whether the access token expires within `leeway` of `now`
    ///
    /// A token with no recorded expiry is assumed to still be valid.
    pub fn token_expires_within(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.get_token_expires_at() {
            Some(expires_at) => expires_at <= now + leeway,
            None => false,
        }
    }

    /// Replaces the stored tokens after a refresh
    ///
    /// Google usually omits the refresh token on refresh responses, in which
    /// case the existing one is kept.
    pub fn set_tokens(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        token_expires_at: Option<DateTime<Utc>>,
    ) {
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.token_expires_at = token_expires_at.map(|ts| ts.naive_utc());
        self.updated_at = Utc::now().naive_utc();
    }

    /// A token-free description for API responses
    pub fn status_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "provider": self.provider,
            "calendar_id": self.calendar_id,
            "scope": self.scope,
            "token_expires_at": self.get_token_expires_at(),
            "connected_at": self.get_created_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integration_expiring_at(expires_at: Option<DateTime<Utc>>) -> Integration {
        Integration::new(
            "user".to_string(),
            IntegrationProvider::GoogleCalendar,
            "access".to_string(),
            Some("refresh".to_string()),
            expires_at,
            None,
            "primary".to_string(),
        )
    }

    #[test]
    fn test_token_expiry_leeway() {
        let now = Utc::now();
        let leeway = Duration::seconds(60);

        assert!(integration_expiring_at(Some(now + Duration::seconds(30))).token_expires_within(now, leeway));
        assert!(!integration_expiring_at(Some(now + Duration::minutes(30))).token_expires_within(now, leeway));
        assert!(!integration_expiring_at(None).token_expires_within(now, leeway));
    }

    #[test]
    fn test_refresh_keeps_existing_refresh_token() {
        let mut integration = integration_expiring_at(None);
        integration.set_tokens("new-access".to_string(), None, None);

        assert_eq!(integration.get_access_token(), "new-access");
        assert_eq!(integration.get_refresh_token(), Some("refresh".to_string()));
    }

    #[test]
    fn test_serialization_hides_tokens() {
        let integration = integration_expiring_at(None);
        let json = serde_json::to_value(&integration).unwrap();

        assert!(json.get("access_token").is_none());
        assert!(json.get("refresh_token").is_none());
        assert!(integration.status_json().get("access_token").is_none());
    }
}
