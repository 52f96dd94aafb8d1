use super::UserSummary;
use crate::primitives::{AnnouncementId, UserId};
use crate::storage::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub contents: String,
    pub summary: String,
    pub views: u64,
    pub publish_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: UserId,
}

impl Record for Announcement {
    type Id = AnnouncementId;
    const TABLE: &'static str = "announcements";

    fn id(&self) -> AnnouncementId {
        self.id
    }
}

impl Announcement {
    #[must_use]
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.publish_at <= now
    }

    pub fn view(&self, author: Option<UserSummary>) -> AnnouncementView {
        AnnouncementView {
            id: self.id,
            title: self.title.clone(),
            contents: self.contents.clone(),
            summary: self.summary.clone(),
            views: self.views,
            publish_at: self.publish_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    pub id: AnnouncementId,
    pub title: String,
    pub contents: String,
    pub summary: String,
    pub views: u64,
    pub publish_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<UserSummary>,
}
