//! # Announcements Module
//!
//! Club notices. Readers only ever see announcements whose `publish_at` has
//! passed; every detail read bumps the view counter in the same transaction
//! that loads the row.

use crate::error::{Result, StceError};
use crate::model::{Announcement, AnnouncementView, User};
use crate::primitives::{AnnouncementId, UserId};
use crate::storage::{Reader, Store};
use crate::validate::{Check, Validate, parse_timestamp};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub contents: String,
    pub summary: String,
    pub publish_at: Option<String>,
}

impl Validate for CreateAnnouncementRequest {
    fn validate(&self) -> Result<()> {
        let mut check = Check::new();
        check
            .non_empty("title", &self.title)
            .non_empty("contents", &self.contents)
            .non_empty("summary", &self.summary);
        if let Some(raw) = &self.publish_at {
            check.ensure(
                parse_timestamp("publishAt", raw).is_ok(),
                "publishAt must be a valid ISO 8601 date string",
            );
        }
        check.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub contents: Option<String>,
    pub summary: Option<String>,
    pub publish_at: Option<String>,
}

impl Validate for UpdateAnnouncementRequest {
    fn validate(&self) -> Result<()> {
        let mut check = Check::new();
        if let Some(title) = &self.title {
            check.non_empty("title", title);
        }
        if let Some(contents) = &self.contents {
            check.non_empty("contents", contents);
        }
        if let Some(summary) = &self.summary {
            check.non_empty("summary", summary);
        }
        if let Some(raw) = &self.publish_at {
            check.ensure(
                parse_timestamp("publishAt", raw).is_ok(),
                "publishAt must be a valid ISO 8601 date string",
            );
        }
        check.finish()
    }
}

fn not_found(id: AnnouncementId) -> StceError {
    StceError::not_found(format!("Announcement with id {id} not found"))
}

fn with_author(tx: &impl Reader, row: &Announcement) -> Result<AnnouncementView> {
    let author = tx.get::<User>(row.author_id)?.map(|u| u.summary());
    Ok(row.view(author))
}

#[derive(Clone)]
pub struct AnnouncementService {
    store: Arc<Store>,
}

impl AnnouncementService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Published announcements, newest first.
    pub fn find_all(&self) -> Result<Vec<AnnouncementView>> {
        let now = Utc::now();
        self.store.read(|tx| {
            let mut rows = tx.find::<Announcement>(|a| a.is_published(now))?;
            rows.sort_by(|a, b| b.publish_at.cmp(&a.publish_at).then(b.id.cmp(&a.id)));
            rows.iter().map(|row| with_author(tx, row)).collect()
        })
    }

    /// Load one published announcement and count the view.
    pub fn find_one(&self, id: AnnouncementId) -> Result<AnnouncementView> {
        let now = Utc::now();
        self.store.write(|tx| {
            let mut row = tx
                .get::<Announcement>(id)?
                .filter(|a| a.is_published(now))
                .ok_or_else(|| not_found(id))?;
            row.views = row.views.saturating_add(1);
            tx.put(&row)?;
            with_author(tx, &row)
        })
    }

    pub fn create(
        &self,
        req: CreateAnnouncementRequest,
        author_id: UserId,
    ) -> Result<AnnouncementView> {
        req.validate()?;
        let now = Utc::now();
        let publish_at = match &req.publish_at {
            Some(raw) => parse_timestamp("publishAt", raw)?,
            None => now,
        };

        self.store.write(|tx| {
            if !tx.exists::<User>(author_id)? {
                return Err(StceError::not_found(format!(
                    "User with ID {author_id} not found"
                )));
            }
            let row = tx.insert(|id| Announcement {
                id,
                title: req.title,
                contents: req.contents,
                summary: req.summary,
                views: 0,
                publish_at,
                created_at: now,
                updated_at: now,
                author_id,
            })?;
            with_author(tx, &row)
        })
    }

    pub fn update(
        &self,
        id: AnnouncementId,
        req: UpdateAnnouncementRequest,
    ) -> Result<AnnouncementView> {
        req.validate()?;
        let publish_at = req
            .publish_at
            .as_deref()
            .map(|raw| parse_timestamp("publishAt", raw))
            .transpose()?;

        self.store.write(|tx| {
            let mut row = tx.get::<Announcement>(id)?.ok_or_else(|| not_found(id))?;
            let mut changed = false;
            if let Some(v) = req.title {
                row.title = v;
                changed = true;
            }
            if let Some(v) = req.contents {
                row.contents = v;
                changed = true;
            }
            if let Some(v) = req.summary {
                row.summary = v;
                changed = true;
            }
            if let Some(v) = publish_at {
                row.publish_at = v;
                changed = true;
            }
            if changed {
                row.updated_at = Utc::now();
                tx.put(&row)?;
            }
            with_author(tx, &row)
        })
    }

    pub fn remove(&self, id: AnnouncementId) -> Result<()> {
        self.store.write(|tx| {
            if tx.remove::<Announcement>(id)? {
                Ok(())
            } else {
                Err(not_found(id))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::auth::tests::seed_user;
    use crate::model::memory_store;
    use chrono::Duration;

    fn setup() -> (AnnouncementService, UserId) {
        let store = Arc::new(memory_store().unwrap());
        let admin = seed_user(&store, "admin", true);
        (AnnouncementService::new(store), admin)
    }

    fn request(title: &str, publish_at: Option<String>) -> CreateAnnouncementRequest {
        CreateAnnouncementRequest {
            title: title.to_string(),
            contents: "contents".to_string(),
            summary: "summary".to_string(),
            publish_at,
        }
    }

    #[test]
    fn unpublished_announcements_are_invisible() {
        let (svc, admin) = setup();
        let future = (Utc::now() + Duration::days(7)).to_rfc3339();
        let hidden = svc.create(request("later", Some(future)), admin).unwrap();
        svc.create(request("now", None), admin).unwrap();

        let list = svc.find_all().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "now");
        assert!(matches!(svc.find_one(hidden.id), Err(StceError::NotFound(_))));
    }

    #[test]
    fn list_is_newest_first_with_author() {
        let (svc, admin) = setup();
        let past = (Utc::now() - Duration::days(2)).to_rfc3339();
        svc.create(request("old", Some(past)), admin).unwrap();
        svc.create(request("new", None), admin).unwrap();

        let list = svc.find_all().unwrap();
        let titles: Vec<_> = list.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["new", "old"]);
        assert_eq!(list[0].author.as_ref().unwrap().username, "admin");
    }

    #[test]
    fn each_detail_read_counts_one_view() {
        let (svc, admin) = setup();
        let created = svc.create(request("hello", None), admin).unwrap();
        assert_eq!(created.views, 0);
        assert_eq!(svc.find_one(created.id).unwrap().views, 1);
        assert_eq!(svc.find_one(created.id).unwrap().views, 2);
        assert_eq!(svc.find_all().unwrap()[0].views, 2);
    }

    #[test]
    fn create_validates_body() {
        let (svc, admin) = setup();
        let err = svc.create(request("  ", Some("tomorrow".to_string())), admin).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("title should not be empty"));
        assert!(msg.contains("publishAt"));
    }

    #[test]
    fn update_is_partial_and_empty_update_is_a_no_op() {
        let (svc, admin) = setup();
        let created = svc.create(request("first", None), admin).unwrap();

        let same = svc
            .update(created.id, UpdateAnnouncementRequest::default())
            .unwrap();
        assert_eq!(same, created);

        let changed = svc
            .update(
                created.id,
                UpdateAnnouncementRequest {
                    title: Some("second".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(changed.title, "second");
        assert_eq!(changed.summary, "summary");
    }

    #[test]
    fn missing_ids_are_not_found() {
        let (svc, _) = setup();
        let ghost = AnnouncementId(42);
        assert!(matches!(svc.remove(ghost), Err(StceError::NotFound(_))));
        assert!(matches!(
            svc.update(ghost, UpdateAnnouncementRequest::default()),
            Err(StceError::NotFound(_))
        ));
    }

    #[test]
    fn remove_deletes_row() {
        let (svc, admin) = setup();
        let created = svc.create(request("bye", None), admin).unwrap();
        svc.remove(created.id).unwrap();
        assert!(svc.find_all().unwrap().is_empty());
    }
}
