use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Progress of a planned post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostIdeaStatus {
    Idea,
    Planned,
    Posted,
}

impl PostIdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostIdeaStatus::Idea => "idea",
            PostIdeaStatus::Planned => "planned",
            PostIdeaStatus::Posted => "posted",
        }
    }
}

impl FromStr for PostIdeaStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea" => Ok(PostIdeaStatus::Idea),
            "planned" => Ok(PostIdeaStatus::Planned),
            "posted" => Ok(PostIdeaStatus::Posted),
            other => Err(ParseEnumError::new("post idea status", other)),
        }
    }
}

/// Represents a planned content item that comes out of a shoot
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::post_ideas)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PostIdea {
    /// Unique identifier for the post idea (UUID v4 as string)
    id: String,

    /// The shoot this idea belongs to
    shoot_id: String,

    /// Working title
    title: String,

    /// Draft caption
    caption: Option<String>,

    /// Target platform, e.g. "instagram"
    platform: Option<String>,

    /// Stored status name, see [`PostIdeaStatus`]
    status: String,

    /// When this idea was created
    created_at: NaiveDateTime,

    /// When this idea was last modified
    updated_at: NaiveDateTime,
}

impl PostIdea {
    pub fn new(shoot_id: String, title: String, caption: Option<String>, platform: Option<String>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            shoot_id,
            title,
            caption,
            platform,
            status: PostIdeaStatus::Idea.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_shoot_id(&self) -> String {
        self.shoot_id.clone()
    }

    pub fn get_title(&self) -> String {
        self.title.clone()
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn get_caption(&self) -> Option<String> {
        self.caption.clone()
    }

    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption;
    }

    pub fn get_platform(&self) -> Option<String> {
        self.platform.clone()
    }

    pub fn set_platform(&mut self, platform: Option<String>) {
        self.platform = platform;
    }

    pub fn get_status(&self) -> PostIdeaStatus {
        self.status.parse().unwrap_or(PostIdeaStatus::Idea)
    }

    pub fn set_status(&mut self, status: PostIdeaStatus) {
        self.status = status.as_str().to_string();
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }
}
