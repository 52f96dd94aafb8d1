//! # Study Module
//!
//! Study groups: membership, progress notes and uploaded resources.
//!
//! Membership is a set of [`StudyRole`] rows, one per (study, user). The row
//! named [`STUDY_LEADER_ROLE`] marks the leader; every other row is a member.
//!
//! Permission tiers:
//! - admin: create, delete, change leader
//! - manager (admin or the study's leader): members, progress and resource writes
//! - participant (manager or any role holder): member, progress and resource reads

use crate::auth::Actor;
use crate::error::{Result, StceError};
use crate::model::{
    AvailableMember, Created, Progress, ProgressView, Resource, ResourceView, Study, StudyDetail,
    StudyMember, StudyRole, StudySummary, Success, User,
};
use crate::primitives::{ProgressId, ResourceId, STUDY_LEADER_ROLE, StudyId, UserId};
use crate::storage::{Reader, Store};
use crate::validate::{Check, Validate};
use chrono::Utc;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest accepted resource upload.
pub const MAX_RESOURCE_BYTES: usize = 10 * 1024 * 1024;

/// Accepted resource extensions, lower-case.
pub const RESOURCE_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx"];

// =============================================================================
// DTOS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyListQuery {
    pub year: Option<String>,
}

impl StudyListQuery {
    pub fn year(&self) -> Result<Option<i16>> {
        match self.year.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i16>()
                .map(Some)
                .map_err(|_| StceError::bad_request("Year must be an integer.")),
        }
    }
}

impl Validate for StudyListQuery {
    fn validate(&self) -> Result<()> {
        self.year().map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudyRequest {
    pub study_name: String,
    pub start_year: i16,
    pub study_description: String,
    pub leader_id: UserId,
}

impl Validate for CreateStudyRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .non_empty("study_name", &self.study_name)
            .at_least("start_year", i64::from(self.start_year), 2000)
            .non_empty("study_description", &self.study_description)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLeaderRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    pub role_name: String,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .non_empty("role_name", &self.role_name)
            .ensure(
                self.role_name.trim() != STUDY_LEADER_ROLE,
                "role_name must not be Leader; use the leader endpoint instead",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProgressRequest {
    pub title: String,
    pub content: String,
}

impl Validate for CreateProgressRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .non_empty("title", &self.title)
            .non_empty("content", &self.content)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProgressRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdateProgressRequest {
    fn has_changes(&self) -> bool {
        [&self.title, &self.content]
            .into_iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

impl Validate for UpdateProgressRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .ensure(
                self.has_changes(),
                "At least one field to update must be provided.",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableMembersQuery {
    pub search: Option<String>,
}

impl Validate for AvailableMembersQuery {
    fn validate(&self) -> Result<()> {
        Check::new()
            .ensure(
                self.search
                    .as_deref()
                    .is_some_and(|s| s.chars().count() >= 2),
                "search must be longer than or equal to 2 characters",
            )
            .finish()
    }
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Upper-case format of an accepted resource file name.
pub fn resource_format(file_name: &str) -> Result<String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| RESOURCE_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| StceError::bad_request("Only pdf, docx and pptx files are allowed"))?;
    Ok(ext.to_ascii_uppercase())
}

// =============================================================================
// HELPERS
// =============================================================================

fn study_not_found() -> StceError {
    StceError::not_found("Study not found")
}

fn load_study(tx: &impl Reader, id: StudyId) -> Result<Study> {
    tx.get::<Study>(id)?.ok_or_else(study_not_found)
}

fn roles_of(tx: &impl Reader, study_id: StudyId) -> Result<Vec<StudyRole>> {
    tx.find::<StudyRole>(|r| r.study_id == study_id)
}

fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(StceError::forbidden("Admin privileges required"))
    }
}

fn require_manager(tx: &impl Reader, study_id: StudyId, actor: &Actor) -> Result<()> {
    if actor.is_admin {
        return Ok(());
    }
    let leads = tx
        .find_first::<StudyRole>(|r| r.study_id == study_id && r.user_id == actor.id && r.is_leader())?
        .is_some();
    if leads {
        Ok(())
    } else {
        Err(StceError::forbidden(
            "Only an admin or the study leader can do this",
        ))
    }
}

fn require_participant(tx: &impl Reader, study_id: StudyId, actor: &Actor) -> Result<()> {
    if actor.is_admin {
        return Ok(());
    }
    let holds_role = tx
        .find_first::<StudyRole>(|r| r.study_id == study_id && r.user_id == actor.id)?
        .is_some();
    if holds_role {
        Ok(())
    } else {
        Err(StceError::forbidden("Only study participants can view this"))
    }
}

fn member_of(tx: &impl Reader, role: &StudyRole) -> Result<Option<StudyMember>> {
    Ok(tx.get::<User>(role.user_id)?.map(|user| StudyMember {
        user_id: user.id,
        name: user.name,
        role_name: role.role_name.clone(),
    }))
}

fn remove_files(paths: impl IntoIterator<Item = String>) {
    for path in paths {
        // Best-effort: a missing file is not worth failing the request over.
        let _ = fs::remove_file(path);
    }
}

/// Runs `op`, deleting the files it recorded as written when it fails.
///
/// Uploads land on disk before their transaction commits, so a failed
/// commit would otherwise leave the file behind.
fn with_file_cleanup<T>(op: impl FnOnce(&mut Vec<String>) -> Result<T>) -> Result<T> {
    let mut written = Vec::new();
    let result = op(&mut written);
    if result.is_err() {
        remove_files(written);
    }
    result
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct StudyService {
    store: Arc<Store>,
    upload_dir: PathBuf,
}

impl StudyService {
    pub fn new(store: Arc<Store>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn find_all(&self, query: &StudyListQuery) -> Result<Vec<StudySummary>> {
        let year = query.year()?;
        self.store.read(|tx| {
            let studies = tx.find::<Study>(|s| year.is_none_or(|y| s.start_year == y))?;
            let roles = tx.scan::<StudyRole>()?;
            let mut out = Vec::with_capacity(studies.len());
            for study in studies {
                let of_study: Vec<_> = roles.iter().filter(|r| r.study_id == study.id).collect();
                let leader_name = match of_study.iter().find(|r| r.is_leader()) {
                    Some(role) => tx.get::<User>(role.user_id)?.map(|u| u.name),
                    None => None,
                };
                out.push(StudySummary {
                    id: study.id,
                    study_name: study.study_name,
                    start_year: study.start_year,
                    study_description: study.study_description,
                    leader_name,
                    members_count: of_study.len(),
                });
            }
            Ok(out)
        })
    }

    pub fn find_by_id(&self, id: StudyId) -> Result<StudyDetail> {
        self.store.read(|tx| {
            let study = load_study(tx, id)?;
            let mut leader = None;
            let mut members = Vec::new();
            for role in roles_of(tx, id)? {
                let Some(member) = member_of(tx, &role)? else {
                    continue;
                };
                if role.is_leader() {
                    leader = Some(member);
                } else {
                    members.push(member);
                }
            }
            let resources = tx
                .find::<Resource>(|r| r.study_id == id)?
                .iter()
                .map(Resource::view)
                .collect();
            let progress = tx
                .find::<Progress>(|p| p.study_id == id)?
                .iter()
                .map(Progress::view)
                .collect();
            Ok(StudyDetail {
                id: study.id,
                study_name: study.study_name,
                start_year: study.start_year,
                study_description: study.study_description,
                leader,
                members,
                resources,
                progress,
            })
        })
    }

    pub fn create(&self, actor: &Actor, req: CreateStudyRequest) -> Result<Created<StudyId>> {
        require_admin(actor)?;
        req.validate()?;
        let now = Utc::now();
        self.store.write(|tx| {
            if !tx.exists::<User>(req.leader_id)? {
                return Err(StceError::bad_request(format!(
                    "Leader with ID \"{}\" not found.",
                    req.leader_id
                )));
            }
            let study = tx.insert(|id| Study {
                id,
                study_name: req.study_name,
                start_year: req.start_year,
                study_description: req.study_description,
                created_at: now,
                updated_at: now,
            })?;
            tx.insert(|id| StudyRole {
                id,
                study_id: study.id,
                user_id: req.leader_id,
                role_name: STUDY_LEADER_ROLE.to_string(),
                created_at: now,
                updated_at: now,
            })?;
            Ok(Created::new(study.id))
        })
    }

    pub fn delete(&self, actor: &Actor, id: StudyId) -> Result<Success> {
        require_admin(actor)?;
        let resources = self.store.write(|tx| {
            if !tx.remove::<Study>(id)? {
                return Err(study_not_found());
            }
            tx.remove_where::<StudyRole>(|r| r.study_id == id)?;
            tx.remove_where::<Progress>(|p| p.study_id == id)?;
            tx.remove_where::<Resource>(|r| r.study_id == id)
        })?;
        remove_files(resources.into_iter().map(|r| r.dir_path));
        Ok(Success::OK)
    }

    /// Leader and members alike.
    pub fn find_members(&self, actor: &Actor, id: StudyId) -> Result<Vec<StudyMember>> {
        self.store.read(|tx| {
            load_study(tx, id)?;
            require_participant(tx, id, actor)?;
            let mut out = Vec::new();
            for role in roles_of(tx, id)? {
                if let Some(member) = member_of(tx, &role)? {
                    out.push(member);
                }
            }
            Ok(out)
        })
    }

    /// Make `req.user_id` the leader. Any member role the new leader held is
    /// dropped so they end up with exactly one role in the study.
    pub fn update_leader(
        &self,
        actor: &Actor,
        id: StudyId,
        req: UpdateLeaderRequest,
    ) -> Result<Success> {
        require_admin(actor)?;
        let new_leader = req.user_id;
        self.store.write(|tx| {
            load_study(tx, id)?;
            if !tx.exists::<User>(new_leader)? {
                return Err(StceError::not_found("User not found"));
            }
            tx.remove_where::<StudyRole>(|r| {
                r.study_id == id && r.user_id == new_leader && !r.is_leader()
            })?;

            let now = Utc::now();
            match tx.find_first::<StudyRole>(|r| r.study_id == id && r.is_leader())? {
                Some(mut role) => {
                    role.user_id = new_leader;
                    role.updated_at = now;
                    tx.put(&role)?;
                }
                None => {
                    tx.insert(|role_id| StudyRole {
                        id: role_id,
                        study_id: id,
                        user_id: new_leader,
                        role_name: STUDY_LEADER_ROLE.to_string(),
                        created_at: now,
                        updated_at: now,
                    })?;
                }
            }
            Ok(Success::OK)
        })
    }

    pub fn add_member(&self, actor: &Actor, id: StudyId, req: AddMemberRequest) -> Result<Success> {
        req.validate()?;
        self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            if !tx.exists::<User>(req.user_id)? {
                return Err(StceError::not_found("User not found"));
            }
            let existing =
                tx.find_first::<StudyRole>(|r| r.study_id == id && r.user_id == req.user_id)?;
            if existing.is_some() {
                return Err(StceError::conflict("User already exists in study"));
            }
            let now = Utc::now();
            tx.insert(|role_id| StudyRole {
                id: role_id,
                study_id: id,
                user_id: req.user_id,
                role_name: req.role_name.trim().to_string(),
                created_at: now,
                updated_at: now,
            })?;
            Ok(Success::OK)
        })
    }

    pub fn remove_member(&self, actor: &Actor, id: StudyId, user_id: UserId) -> Result<Success> {
        self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            let removed = tx.remove_where::<StudyRole>(|r| r.study_id == id && r.user_id == user_id)?;
            if removed.is_empty() {
                return Err(StceError::not_found("Member not found in study"));
            }
            Ok(Success::OK)
        })
    }

    pub fn find_progress(&self, actor: &Actor, id: StudyId) -> Result<Vec<ProgressView>> {
        self.store.read(|tx| {
            load_study(tx, id)?;
            require_participant(tx, id, actor)?;
            Ok(tx
                .find::<Progress>(|p| p.study_id == id)?
                .iter()
                .map(Progress::view)
                .collect())
        })
    }

    pub fn create_progress(
        &self,
        actor: &Actor,
        id: StudyId,
        req: CreateProgressRequest,
    ) -> Result<Created<ProgressId>> {
        req.validate()?;
        self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            let now = Utc::now();
            let progress = tx.insert(|progress_id| Progress {
                id: progress_id,
                study_id: id,
                title: req.title,
                content: req.content,
                created_at: now,
                updated_at: now,
            })?;
            Ok(Created::new(progress.id))
        })
    }

    pub fn update_progress(
        &self,
        actor: &Actor,
        id: StudyId,
        progress_id: ProgressId,
        req: UpdateProgressRequest,
    ) -> Result<Success> {
        self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            req.validate()?;
            let mut progress = tx
                .get::<Progress>(progress_id)?
                .filter(|p| p.study_id == id)
                .ok_or_else(|| progress_not_found(progress_id, id))?;
            if let Some(title) = req.title.filter(|t| !t.is_empty()) {
                progress.title = title;
            }
            if let Some(content) = req.content.filter(|c| !c.is_empty()) {
                progress.content = content;
            }
            progress.updated_at = Utc::now();
            tx.put(&progress)?;
            Ok(Success::OK)
        })
    }

    pub fn delete_progress(
        &self,
        actor: &Actor,
        id: StudyId,
        progress_id: ProgressId,
    ) -> Result<Success> {
        self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            let belongs = tx
                .get::<Progress>(progress_id)?
                .is_some_and(|p| p.study_id == id);
            if !belongs {
                return Err(progress_not_found(progress_id, id));
            }
            tx.remove::<Progress>(progress_id)?;
            Ok(Success::OK)
        })
    }

    pub fn find_resources(&self, actor: &Actor, id: StudyId) -> Result<Vec<ResourceView>> {
        self.store.read(|tx| {
            load_study(tx, id)?;
            require_participant(tx, id, actor)?;
            Ok(tx
                .find::<Resource>(|r| r.study_id == id)?
                .iter()
                .map(Resource::view)
                .collect())
        })
    }

    /// Store `upload` under the upload directory and record it. The row and
    /// the file are created together: if writing the file fails, the
    /// transaction is aborted.
    pub fn upload_resource(&self, actor: &Actor, id: StudyId, upload: Upload) -> Result<ResourceView> {
        let name = Path::new(&upload.file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StceError::bad_request("file is required"))?
            .to_string();
        let format = resource_format(&name)?;
        if upload.bytes.len() > MAX_RESOURCE_BYTES {
            return Err(StceError::bad_request("File must be at most 10 MiB"));
        }

        with_file_cleanup(|written| {
            self.store.write(|tx| {
                load_study(tx, id)?;
                require_manager(tx, id, actor)?;
                let now = Utc::now();
                let resource = tx.insert(|resource_id: ResourceId| Resource {
                    id: resource_id,
                    study_id: id,
                    dir_path: self.stored_path(id, resource_id, &format).display().to_string(),
                    name,
                    format,
                    created_at: now,
                    updated_at: now,
                })?;
                self.write_file(&resource.dir_path, &upload.bytes)?;
                written.push(resource.dir_path.clone());
                Ok(resource.view())
            })
        })
    }

    pub fn delete_resource(
        &self,
        actor: &Actor,
        id: StudyId,
        resource_id: ResourceId,
    ) -> Result<Success> {
        let removed = self.store.write(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            let resource = tx
                .get::<Resource>(resource_id)?
                .filter(|r| r.study_id == id)
                .ok_or_else(|| {
                    StceError::not_found(format!(
                        "Resource with ID \"{resource_id}\" not found in study with ID \"{id}\""
                    ))
                })?;
            tx.remove::<Resource>(resource_id)?;
            Ok(resource)
        })?;
        remove_files([removed.dir_path]);
        Ok(Success::OK)
    }

    /// Users matching `search` by name or email who hold no role in the study.
    pub fn search_available_members(
        &self,
        actor: &Actor,
        id: StudyId,
        query: &AvailableMembersQuery,
    ) -> Result<Vec<AvailableMember>> {
        query.validate()?;
        let needle = query.search.as_deref().unwrap_or_default().to_lowercase();
        self.store.read(|tx| {
            load_study(tx, id)?;
            require_manager(tx, id, actor)?;
            let taken: Vec<UserId> = roles_of(tx, id)?.iter().map(|r| r.user_id).collect();
            let users = tx.find::<User>(|u| {
                !taken.contains(&u.id)
                    && (u.name.to_lowercase().contains(&needle)
                        || u.email.to_lowercase().contains(&needle))
            })?;
            Ok(users
                .into_iter()
                .map(|u| AvailableMember {
                    user_id: u.id,
                    name: u.name,
                    email: u.email,
                })
                .collect())
        })
    }

    fn stored_path(&self, study: StudyId, resource: ResourceId, format: &str) -> PathBuf {
        let salt: u32 = rand::random();
        self.upload_dir.join(format!(
            "study-{study}-{resource}-{salt:08x}.{}",
            format.to_ascii_lowercase()
        ))
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)
            .and_then(|()| fs::write(path, bytes))
            .map_err(|e| StceError::Internal(format!("storing upload: {e}")))
    }
}

fn progress_not_found(progress_id: ProgressId, study_id: StudyId) -> StceError {
    StceError::not_found(format!(
        "Progress with ID \"{progress_id}\" not found in study with ID \"{study_id}\""
    ))
}

// =============================================================================
// TESTS
// =============================================================================
