//! # Teams Module
//!
//! Team recruitment posts.
//!
//! A team owns its roles and members. Exactly one member row per team has
//! `is_leader` set; it is created with the team and carries no role. Other
//! member rows are applications for one of the team's roles. Applying or
//! cancelling never touches a role's counters.

use crate::error::{Result, StceError};
use crate::model::{
    ExecutionType, Team, TeamMember, TeamMemberView, TeamRole, TeamStatus, TeamView, User,
};
use crate::primitives::{TeamId, TeamRoleId, UserId};
use crate::storage::{Reader, Store, WriteTx};
use crate::validate::{Check, Validate, parse_date};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// DTOS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRoleInput {
    pub role_name: String,
    pub recruit_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub title: String,
    pub category: String,
    pub period_start: String,
    pub period_end: String,
    pub deadline: String,
    pub description: String,
    pub tech_stack: Option<String>,
    pub tag: Option<String>,
    pub goals: Option<String>,
    pub execution_type: Option<ExecutionType>,
    pub selection_proc: Option<String>,
    pub link: Option<String>,
    pub contact: String,
    pub project_image: Option<String>,
    #[serde(default)]
    pub roles: Vec<CreateTeamRoleInput>,
}

impl Validate for CreateTeamRequest {
    fn validate(&self) -> Result<()> {
        let mut check = Check::new();
        check
            .non_empty("title", &self.title)
            .non_empty("category", &self.category)
            .non_empty("description", &self.description)
            .non_empty("contact", &self.contact)
            .url("link", self.link.as_deref());
        for (field, raw) in [
            ("periodStart", &self.period_start),
            ("periodEnd", &self.period_end),
            ("deadline", &self.deadline),
        ] {
            check.ensure(
                parse_date(field, raw).is_ok(),
                format!("{field} must be a valid ISO 8601 date string"),
            );
        }
        for role in &self.roles {
            check
                .non_empty("roleName", &role.role_name)
                .at_least("recruitCount", i64::from(role.recruit_count), 1);
        }
        check.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleAction {
    #[default]
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRoleInput {
    pub id: TeamRoleId,
    pub role_name: Option<String>,
    pub recruit_count: Option<u32>,
    #[serde(default)]
    pub action: RoleAction,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub deadline: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<String>,
    pub tag: Option<String>,
    pub goals: Option<String>,
    pub execution_type: Option<ExecutionType>,
    pub selection_proc: Option<String>,
    pub link: Option<String>,
    pub contact: Option<String>,
    pub project_image: Option<String>,
    pub roles_to_update: Option<Vec<UpdateTeamRoleInput>>,
    pub roles_to_add: Option<Vec<CreateTeamRoleInput>>,
}

impl Validate for UpdateTeamRequest {
    fn validate(&self) -> Result<()> {
        let mut check = Check::new();
        for (field, raw) in [
            ("periodStart", &self.period_start),
            ("periodEnd", &self.period_end),
            ("deadline", &self.deadline),
        ] {
            if let Some(raw) = raw {
                check.ensure(
                    parse_date(field, raw).is_ok(),
                    format!("{field} must be a valid ISO 8601 date string"),
                );
            }
        }
        for role in self.roles_to_update.iter().flatten() {
            if let Some(count) = role.recruit_count {
                check.at_least("recruitCount", i64::from(count), 1);
            }
            if let Some(name) = &role.role_name {
                check.non_empty("roleName", name);
            }
        }
        for role in self.roles_to_add.iter().flatten() {
            check
                .non_empty("roleName", &role.role_name)
                .at_least("recruitCount", i64::from(role.recruit_count), 1);
        }
        check.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTeamStatusRequest {
    pub status: TeamStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTeamRequest {
    pub role_id: TeamRoleId,
}

// =============================================================================
// HELPERS
// =============================================================================

fn team_not_found(id: TeamId) -> StceError {
    StceError::not_found(format!("Team with id {id} not found"))
}

fn name_taken(name: &str) -> StceError {
    StceError::conflict(format!("Role name '{name}' already exists."))
}

fn roles_of(tx: &impl Reader, team_id: TeamId) -> Result<Vec<TeamRole>> {
    tx.find::<TeamRole>(|r| r.team_id == team_id)
}

fn user_summary(tx: &impl Reader, id: Option<UserId>) -> Result<Option<crate::model::UserSummary>> {
    match id {
        Some(id) => Ok(tx.get::<User>(id)?.map(|u| u.summary())),
        None => Ok(None),
    }
}

fn member_view(tx: &impl Reader, member: &TeamMember) -> Result<TeamMemberView> {
    let role = match member.role_id {
        Some(role_id) => tx.get::<TeamRole>(role_id)?,
        None => None,
    };
    Ok(TeamMemberView {
        id: member.id,
        team_id: member.team_id,
        user: user_summary(tx, Some(member.user_id))?,
        role,
        is_leader: member.is_leader,
    })
}

fn team_view(tx: &impl Reader, team: &Team, with_members: bool) -> Result<TeamView> {
    let members = if with_members {
        let rows = tx.find::<TeamMember>(|m| m.team_id == team.id)?;
        Some(
            rows.iter()
                .map(|m| member_view(tx, m))
                .collect::<Result<Vec<_>>>()?,
        )
    } else {
        None
    };
    Ok(TeamView {
        id: team.id,
        leader: user_summary(tx, team.leader_id)?,
        title: team.title.clone(),
        category: team.category.clone(),
        period_start: team.period_start,
        period_end: team.period_end,
        deadline: team.deadline,
        description: team.description.clone(),
        tech_stack: team.tech_stack.clone(),
        tag: team.tag.clone(),
        goals: team.goals.clone(),
        execution_type: team.execution_type,
        selection_proc: team.selection_proc.clone(),
        link: team.link.clone(),
        contact: team.contact.clone(),
        status: team.status,
        project_image: team.project_image.clone(),
        created_at: team.created_at,
        updated_at: team.updated_at,
        roles: roles_of(tx, team.id)?,
        members,
    })
}

/// Load a team the caller leads. A team without a leader can not be
/// modified by anyone. `action` completes "Only the team leader can ...".
fn led_team(tx: &impl Reader, id: TeamId, caller: UserId, action: &str) -> Result<Team> {
    let team = tx.get::<Team>(id)?.ok_or_else(|| team_not_found(id))?;
    match team.leader_id {
        None => Err(StceError::forbidden(
            "This team has no leader and cannot be modified",
        )),
        Some(leader) if leader != caller => Err(StceError::forbidden(format!(
            "Only the team leader can {action}"
        ))),
        Some(_) => Ok(team),
    }
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct TeamService {
    store: Arc<Store>,
}

impl TeamService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, user_id: UserId, req: CreateTeamRequest) -> Result<TeamView> {
        if req.roles.is_empty() {
            return Err(StceError::bad_request("At least one role is required"));
        }
        req.validate()?;

        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for role in &req.roles {
            let name = role.role_name.trim();
            if !seen.insert(name) {
                duplicates.insert(name);
            }
        }
        if !duplicates.is_empty() {
            let list: Vec<_> = duplicates.into_iter().collect();
            return Err(StceError::bad_request(format!(
                "Duplicate role names not allowed: {}",
                list.join(", ")
            )));
        }

        let period_start = parse_date("periodStart", &req.period_start)?;
        let period_end = parse_date("periodEnd", &req.period_end)?;
        let deadline = parse_date("deadline", &req.deadline)?;
        let now = Utc::now();

        self.store.write(|tx| {
            if !tx.exists::<User>(user_id)? {
                return Err(StceError::not_found("User not found"));
            }
            let team = tx.insert(|id| Team {
                id,
                leader_id: Some(user_id),
                title: req.title,
                category: req.category,
                period_start,
                period_end,
                deadline,
                description: req.description,
                tech_stack: req.tech_stack,
                tag: req.tag,
                goals: req.goals,
                execution_type: req.execution_type.unwrap_or_default(),
                selection_proc: req.selection_proc,
                link: req.link,
                contact: req.contact,
                status: TeamStatus::Open,
                project_image: req.project_image,
                created_at: now,
                updated_at: now,
            })?;
            for role in req.roles {
                tx.insert(|id| TeamRole {
                    id,
                    team_id: team.id,
                    role_name: role.role_name.trim().to_string(),
                    recruit_count: role.recruit_count,
                    current_count: 0,
                    created_at: now,
                    updated_at: now,
                })?;
            }
            tx.insert(|id| TeamMember {
                id,
                user_id,
                team_id: team.id,
                role_id: None,
                is_leader: true,
            })?;
            team_view(tx, &team, true)
        })
    }

    /// Every team, newest first.
    pub fn find_all(&self) -> Result<Vec<TeamView>> {
        self.store.read(|tx| {
            let mut teams = tx.scan::<Team>()?;
            teams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            teams.iter().map(|t| team_view(tx, t, false)).collect()
        })
    }

    pub fn find_one(&self, id: TeamId) -> Result<TeamView> {
        self.store.read(|tx| {
            let team = tx.get::<Team>(id)?.ok_or_else(|| team_not_found(id))?;
            team_view(tx, &team, false)
        })
    }

    pub fn update(&self, user_id: UserId, id: TeamId, req: UpdateTeamRequest) -> Result<TeamView> {
        req.validate()?;
        let period_start = req
            .period_start
            .as_deref()
            .map(|raw| parse_date("periodStart", raw))
            .transpose()?;
        let period_end = req
            .period_end
            .as_deref()
            .map(|raw| parse_date("periodEnd", raw))
            .transpose()?;
        let deadline = req
            .deadline
            .as_deref()
            .map(|raw| parse_date("deadline", raw))
            .transpose()?;

        self.store.write(|tx| {
            let mut team = led_team(tx, id, user_id, "update this team")?;
            let now = Utc::now();

            if let Some(v) = req.title {
                team.title = v;
            }
            if let Some(v) = req.category {
                team.category = v;
            }
            if let Some(v) = period_start {
                team.period_start = v;
            }
            if let Some(v) = period_end {
                team.period_end = v;
            }
            if let Some(v) = deadline {
                team.deadline = v;
            }
            if let Some(v) = req.description {
                team.description = v;
            }
            if let Some(v) = req.tech_stack {
                team.tech_stack = Some(v);
            }
            if let Some(v) = req.tag {
                team.tag = Some(v);
            }
            if let Some(v) = req.goals {
                team.goals = Some(v);
            }
            if let Some(v) = req.execution_type {
                team.execution_type = v;
            }
            if let Some(v) = req.selection_proc {
                team.selection_proc = Some(v);
            }
            if let Some(v) = req.link {
                team.link = Some(v);
            }
            if let Some(v) = req.contact {
                team.contact = v;
            }
            if let Some(v) = req.project_image {
                team.project_image = Some(v);
            }

            let mut roles = roles_of(tx, team.id)?;
            if let Some(updates) = req.roles_to_update {
                apply_role_updates(tx, &mut roles, updates)?;
            }
            if let Some(additions) = req.roles_to_add {
                add_roles(tx, &mut roles, team.id, additions)?;
            }

            team.updated_at = now;
            tx.put(&team)?;
            team_view(tx, &team, false)
        })
    }

    pub fn remove(&self, user_id: UserId, id: TeamId) -> Result<()> {
        self.store.write(|tx| {
            let team = led_team(tx, id, user_id, "delete this team")?;
            tx.remove_where::<TeamRole>(|r| r.team_id == team.id)?;
            tx.remove_where::<TeamMember>(|m| m.team_id == team.id)?;
            tx.remove::<Team>(team.id)?;
            Ok(())
        })
    }

    pub fn change_status(&self, user_id: UserId, id: TeamId, status: TeamStatus) -> Result<TeamView> {
        self.store.write(|tx| {
            let mut team = led_team(tx, id, user_id, "change the status")?;
            team.status = status;
            team.updated_at = Utc::now();
            tx.put(&team)?;
            team_view(tx, &team, false)
        })
    }

    pub fn apply(
        &self,
        user_id: UserId,
        team_id: TeamId,
        req: ApplyTeamRequest,
    ) -> Result<TeamMemberView> {
        self.store.write(|tx| {
            let team = tx
                .get::<Team>(team_id)?
                .ok_or_else(|| team_not_found(team_id))?;
            if !tx.exists::<User>(user_id)? {
                return Err(StceError::not_found("User not found"));
            }
            let existing =
                tx.find_first::<TeamMember>(|m| m.team_id == team_id && m.user_id == user_id)?;
            if existing.is_some() {
                return Err(StceError::bad_request(
                    "You have already applied to this team",
                ));
            }
            let role = tx
                .get::<TeamRole>(req.role_id)?
                .filter(|r| r.team_id == team_id)
                .ok_or_else(|| {
                    StceError::not_found(format!("Role with id {} not found", req.role_id))
                })?;
            if team.status == TeamStatus::Closed {
                return Err(StceError::bad_request("This team is no longer recruiting"));
            }

            let member = tx.insert(|id| TeamMember {
                id,
                user_id,
                team_id,
                role_id: Some(role.id),
                is_leader: false,
            })?;
            member_view(tx, &member)
        })
    }

    pub fn cancel_apply(&self, user_id: UserId, team_id: TeamId) -> Result<()> {
        self.store.write(|tx| {
            let member = tx
                .find_first::<TeamMember>(|m| m.team_id == team_id && m.user_id == user_id)?
                .ok_or_else(|| StceError::not_found("Application not found"))?;
            if member.is_leader {
                return Err(StceError::forbidden("Leader cannot cancel application"));
            }
            tx.remove::<TeamMember>(member.id)?;
            Ok(())
        })
    }
}

/// Rename, recount or delete existing roles. Name clashes are checked
/// against the roles as they stand after the earlier entries were applied.
fn apply_role_updates(
    tx: &WriteTx,
    roles: &mut Vec<TeamRole>,
    updates: Vec<UpdateTeamRoleInput>,
) -> Result<()> {
    let now = Utc::now();
    for update in updates {
        let idx = roles
            .iter()
            .position(|r| r.id == update.id)
            .ok_or_else(|| {
                StceError::bad_request(format!(
                    "Role with id {} not found in this team",
                    update.id
                ))
            })?;

        if update.action == RoleAction::Delete {
            let role = roles.remove(idx);
            tx.remove::<TeamRole>(role.id)?;
            for mut member in tx.find::<TeamMember>(|m| m.role_id == Some(role.id))? {
                member.role_id = None;
                tx.put(&member)?;
            }
            continue;
        }

        if let Some(name) = update.role_name.as_deref().map(str::trim) {
            let clash = roles
                .iter()
                .any(|r| r.id != update.id && r.role_name.trim() == name);
            if clash {
                return Err(name_taken(name));
            }
            roles[idx].role_name = name.to_string();
        }
        if let Some(count) = update.recruit_count {
            roles[idx].recruit_count = count;
        }
        roles[idx].updated_at = now;
        tx.put(&roles[idx])?;
    }
    Ok(())
}

fn add_roles(
    tx: &WriteTx,
    roles: &mut Vec<TeamRole>,
    team_id: TeamId,
    additions: Vec<CreateTeamRoleInput>,
) -> Result<()> {
    let now = Utc::now();
    for input in additions {
        let name = input.role_name.trim().to_string();
        if roles.iter().any(|r| r.role_name.trim() == name) {
            return Err(name_taken(&name));
        }
        let role = tx.insert(|id| TeamRole {
            id,
            team_id,
            role_name: name,
            recruit_count: input.recruit_count,
            current_count: 0,
            created_at: now,
            updated_at: now,
        })?;
        roles.push(role);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
