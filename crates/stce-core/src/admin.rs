//! # Admin Module
//!
//! Member administration: search, partial update and removal.
//!
//! Removing a member cascades the way the relational schema would: their
//! announcements, team memberships and study roles go with them, and teams
//! they lead lose their leader.

use crate::auth::ensure_unique_identity;
use crate::error::{Result, StceError};
use crate::model::{
    Announcement, EducationStatus, Gender, MemberProfile, StudyRole, Team, TeamMember, User,
};
use crate::password::Hasher;
use crate::primitives::UserId;
use crate::storage::{Reader, Store, WriteTx};
use crate::validate::{Check, Validate, parse_date};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

// =============================================================================
// DTOS
// =============================================================================

/// Searchable member columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Email,
    StudentNumber,
    GithubUsername,
    TechStack,
}

impl SearchField {
    const ALLOWED: &'static str = "name, email, student_number, github_username, tech_stack";

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "student_number" => Some(Self::StudentNumber),
            "github_username" => Some(Self::GithubUsername),
            "tech_stack" => Some(Self::TechStack),
            _ => None,
        }
    }

    fn matches(self, user: &User, word: &str) -> bool {
        let needle = word.to_lowercase();
        let contains = |hay: &str| hay.to_lowercase().contains(&needle);
        match self {
            Self::Name => contains(&user.name),
            Self::Email => contains(&user.email),
            Self::StudentNumber => contains(&user.student_number),
            Self::GithubUsername => user.github_username.as_deref().is_some_and(contains),
            Self::TechStack => user
                .tech_stack
                .as_ref()
                .is_some_and(|stack| stack.iter().any(|t| t == word)),
        }
    }
}

/// `?type=&word=`. Both are optional at the parsing stage so that a missing
/// one surfaces as a validation message rather than a bare rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub word: Option<String>,
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<()> {
        Check::new()
            .ensure(
                self.kind.as_deref().and_then(SearchField::parse).is_some(),
                format!("type must be one of the following values: {}", SearchField::ALLOWED),
            )
            .ensure(
                self.word.as_deref().is_some_and(|w| !w.is_empty()),
                "word should not be empty",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub major: Option<String>,
    pub join_year: Option<i16>,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub tech_stack: Option<Vec<String>>,
    pub education_status: Option<EducationStatus>,
    pub current_company: Option<String>,
    pub baekjoon_username: Option<String>,
    pub github_username: Option<String>,
    pub self_description: Option<String>,
    pub portfolio_link: Option<String>,
    pub profile_image: Option<String>,
    pub is_public_current_company: Option<bool>,
    pub is_public_github_username: Option<bool>,
    pub is_public_baekjoon_username: Option<bool>,
    pub is_public_email: Option<bool>,
    pub is_public_tech_stack: Option<bool>,
    pub is_public_education_status: Option<bool>,
    pub is_public_portfolio_link: Option<bool>,
}

impl Validate for UpdateMemberRequest {
    fn validate(&self) -> Result<()> {
        let mut check = Check::new();
        if let Some(username) = &self.username {
            check.length("username", username, 3, 50);
        }
        if let Some(password) = &self.password {
            check.length("password", password, 8, 255);
        }
        if let Some(name) = &self.name {
            check.length("name", name, 1, 50);
        }
        if let Some(student_number) = &self.student_number {
            check.length("student_number", student_number, 1, 20);
        }
        if let Some(phone_number) = &self.phone_number {
            check.length("phone_number", phone_number, 1, 20);
        }
        if let Some(email) = &self.email {
            check.email("email", email);
        }
        if let Some(birth_date) = &self.birth_date {
            check.ensure(
                parse_date("birth_date", birth_date).is_ok(),
                "birth_date must be a valid ISO 8601 date string",
            );
        }
        check
            .max_len("major", self.major.as_deref(), 100)
            .max_len("current_company", self.current_company.as_deref(), 255)
            .max_len("baekjoon_username", self.baekjoon_username.as_deref(), 255)
            .max_len("github_username", self.github_username.as_deref(), 255)
            .max_len("profile_image", self.profile_image.as_deref(), 255)
            .finish()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct AdminService {
    store: Arc<Store>,
    hasher: Hasher,
}

impl AdminService {
    pub fn new(store: Arc<Store>, hasher: Hasher) -> Self {
        Self { store, hasher }
    }

    pub fn search(&self, query: &SearchQuery) -> Result<Vec<MemberProfile>> {
        query.validate()?;
        let field = query
            .kind
            .as_deref()
            .and_then(SearchField::parse)
            .ok_or_else(|| StceError::bad_request("invalid search type"))?;
        let word = query.word.as_deref().unwrap_or_default();

        let found = self
            .store
            .read(|tx| tx.find::<User>(|u| field.matches(u, word)))?;
        Ok(found.iter().map(User::profile).collect())
    }

    pub fn update(&self, id: UserId, req: UpdateMemberRequest) -> Result<MemberProfile> {
        req.validate()?;
        let birth_date = req
            .birth_date
            .as_deref()
            .map(|raw| parse_date("birth_date", raw))
            .transpose()?;
        let password_hash = req
            .password
            .as_deref()
            .map(|pw| self.hasher.hash(pw))
            .transpose()?;

        let user = self.store.write(|tx| {
            let mut user = tx
                .get::<User>(id)?
                .ok_or_else(|| StceError::not_found(format!("User with ID {id} not found")))?;

            if let Some(v) = req.username {
                user.username = v;
            }
            if let Some(v) = req.email {
                user.email = v;
            }
            if let Some(v) = req.student_number {
                user.student_number = v;
            }
            ensure_unique_identity(
                tx,
                &user.username,
                &user.email,
                &user.student_number,
                Some(id),
            )?;

            if let Some(v) = password_hash {
                user.password_hash = v;
            }
            if let Some(v) = req.name {
                user.name = v;
            }
            if let Some(v) = req.phone_number {
                user.phone_number = v;
            }
            if let Some(v) = req.major {
                user.major = v;
            }
            if let Some(v) = req.join_year {
                user.join_year = v;
            }
            if let Some(v) = birth_date {
                user.birth_date = v;
            }
            if let Some(v) = req.gender {
                user.gender = v;
            }
            if let Some(v) = req.tech_stack {
                user.tech_stack = Some(v);
            }
            if let Some(v) = req.education_status {
                user.education_status = v;
            }
            if let Some(v) = req.current_company {
                user.current_company = Some(v);
            }
            if let Some(v) = req.baekjoon_username {
                user.baekjoon_username = Some(v);
            }
            if let Some(v) = req.github_username {
                user.github_username = Some(v);
            }
            if let Some(v) = req.self_description {
                user.self_description = Some(v);
            }
            if let Some(v) = req.portfolio_link {
                user.portfolio_link = Some(v);
            }
            if let Some(v) = req.profile_image {
                user.profile_image = v;
            }
            if let Some(v) = req.is_public_current_company {
                user.is_public_current_company = v;
            }
            if let Some(v) = req.is_public_github_username {
                user.is_public_github_username = v;
            }
            if let Some(v) = req.is_public_baekjoon_username {
                user.is_public_baekjoon_username = v;
            }
            if let Some(v) = req.is_public_email {
                user.is_public_email = v;
            }
            if let Some(v) = req.is_public_tech_stack {
                user.is_public_tech_stack = v;
            }
            if let Some(v) = req.is_public_education_status {
                user.is_public_education_status = v;
            }
            if let Some(v) = req.is_public_portfolio_link {
                user.is_public_portfolio_link = v;
            }
            user.updated_at = Utc::now();
            tx.put(&user)?;
            Ok(user)
        })?;

        Ok(user.profile())
    }

    pub fn remove(&self, id: UserId) -> Result<()> {
        self.store.write(|tx| remove_user(tx, id))
    }

    /// Grant or revoke the admin flag. Returns the updated profile.
    pub fn set_admin(&self, username: &str, admin: bool) -> Result<MemberProfile> {
        self.store.write(|tx| {
            let mut user = tx
                .find_first::<User>(|u| u.username == username)?
                .ok_or_else(|| StceError::not_found(format!("User {username} not found")))?;
            user.is_admin = admin;
            user.updated_at = Utc::now();
            tx.put(&user)?;
            Ok(user.profile())
        })
    }
}

fn remove_user(tx: &WriteTx, id: UserId) -> Result<()> {
    if !tx.remove::<User>(id)? {
        return Err(StceError::not_found(format!("User with ID {id} not found")));
    }
    tx.remove_where::<Announcement>(|a| a.author_id == id)?;
    tx.remove_where::<TeamMember>(|m| m.user_id == id)?;
    tx.remove_where::<StudyRole>(|r| r.user_id == id)?;
    for mut team in tx.find::<Team>(|t| t.leader_id == Some(id))? {
        team.leader_id = None;
        tx.put(&team)?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
