use super::UserSummary;
use crate::primitives::{TeamId, TeamMemberId, TeamRoleId, UserId};
use crate::storage::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    #[default]
    Online,
    Offline,
    Hybrid,
}

/// A recruitment post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    /// `None` once the leader's account is deleted.
    pub leader_id: Option<UserId>,
    pub title: String,
    pub category: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub deadline: NaiveDate,
    pub description: String,
    pub tech_stack: Option<String>,
    pub tag: Option<String>,
    pub goals: Option<String>,
    pub execution_type: ExecutionType,
    pub selection_proc: Option<String>,
    pub link: Option<String>,
    pub contact: String,
    pub status: TeamStatus,
    pub project_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Team {
    type Id = TeamId;
    const TABLE: &'static str = "teams";

    fn id(&self) -> TeamId {
        self.id
    }
}

/// A position the team is recruiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRole {
    pub id: TeamRoleId,
    pub team_id: TeamId,
    pub role_name: String,
    pub recruit_count: u32,
    pub current_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for TeamRole {
    type Id = TeamRoleId;
    const TABLE: &'static str = "team_roles";

    fn id(&self) -> TeamRoleId {
        self.id
    }
}

/// The leader row or an application. (user, team) is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub user_id: UserId,
    pub team_id: TeamId,
    /// `None` for the leader, or after the applied-for role was deleted.
    pub role_id: Option<TeamRoleId>,
    pub is_leader: bool,
}

impl Record for TeamMember {
    type Id = TeamMemberId;
    const TABLE: &'static str = "team_members";

    fn id(&self) -> TeamMemberId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberView {
    pub id: TeamMemberId,
    pub team_id: TeamId,
    pub user: Option<UserSummary>,
    pub role: Option<TeamRole>,
    pub is_leader: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: TeamId,
    pub leader: Option<UserSummary>,
    pub title: String,
    pub category: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub deadline: NaiveDate,
    pub description: String,
    pub tech_stack: Option<String>,
    pub tag: Option<String>,
    pub goals: Option<String>,
    pub execution_type: ExecutionType,
    pub selection_proc: Option<String>,
    pub link: Option<String>,
    pub contact: String,
    pub status: TeamStatus,
    pub project_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<TeamRole>,
    /// Only populated by create, mirroring what the post author sees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TeamMemberView>>,
}
