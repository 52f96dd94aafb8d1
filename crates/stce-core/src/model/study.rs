use crate::primitives::{ProgressId, ResourceId, StudyId, StudyRoleId, UserId};
use crate::storage::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: StudyId,
    pub study_name: String,
    pub start_year: i16,
    pub study_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Study {
    type Id = StudyId;
    const TABLE: &'static str = "studies";

    fn id(&self) -> StudyId {
        self.id
    }
}

/// Links a user to a study. `role_name == "Leader"` marks the leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRole {
    pub id: StudyRoleId,
    pub study_id: StudyId,
    pub user_id: UserId,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for StudyRole {
    type Id = StudyRoleId;
    const TABLE: &'static str = "study_roles";

    fn id(&self) -> StudyRoleId {
        self.id
    }
}

impl StudyRole {
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.role_name == crate::primitives::STUDY_LEADER_ROLE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: ProgressId,
    pub study_id: StudyId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Progress {
    type Id = ProgressId;
    const TABLE: &'static str = "progress";

    fn id(&self) -> ProgressId {
        self.id
    }
}

impl Progress {
    pub fn view(&self) -> ProgressView {
        ProgressView {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// Metadata for an uploaded study file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub study_id: StudyId,
    pub name: String,
    pub format: String,
    pub dir_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Resource {
    type Id = ResourceId;
    const TABLE: &'static str = "resources";

    fn id(&self) -> ResourceId {
        self.id
    }
}

impl Resource {
    pub fn view(&self) -> ResourceView {
        ResourceView {
            id: self.id,
            name: self.name.clone(),
            format: self.format.clone(),
            dir_path: self.dir_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    pub id: StudyId,
    pub study_name: String,
    pub start_year: i16,
    pub study_description: String,
    pub leader_name: Option<String>,
    pub members_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyMember {
    pub user_id: UserId,
    pub name: String,
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub id: ProgressId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub format: String,
    pub dir_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDetail {
    pub id: StudyId,
    pub study_name: String,
    pub start_year: i16,
    pub study_description: String,
    pub leader: Option<StudyMember>,
    pub members: Vec<StudyMember>,
    pub resources: Vec<ResourceView>,
    pub progress: Vec<ProgressView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMember {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}
