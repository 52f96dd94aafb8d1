//! # Auth Module
//!
//! Registration, login and bearer-token authentication.

use crate::error::{Result, StceError};
use crate::model::{EducationStatus, Gender, SanitizedUser, User};
use crate::password::Hasher;
use crate::primitives::{DEFAULT_PROFILE_IMAGE, UserId};
use crate::storage::{Reader, Store};
use crate::token::{TokenSigner, random_secret};
use crate::validate::{Check, Validate, parse_date};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// DTOS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub student_number: String,
    pub profile_image: Option<String>,
    pub phone_number: String,
    pub email: String,
    pub major: String,
    pub join_year: i16,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub birth_date: String,
    pub gender: Gender,
    pub tech_stack: Option<Vec<String>>,
    pub education_status: EducationStatus,
    pub current_company: Option<String>,
    pub baekjoon_username: Option<String>,
    pub github_username: Option<String>,
    pub self_description: Option<String>,
    pub portfolio_link: Option<String>,
    pub is_public_current_company: Option<bool>,
    pub is_public_github_username: Option<bool>,
    pub is_public_baekjoon_username: Option<bool>,
    pub is_public_email: Option<bool>,
    pub is_public_tech_stack: Option<bool>,
    pub is_public_education_status: Option<bool>,
    pub is_public_portfolio_link: Option<bool>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .length("username", &self.username, 3, 50)
            .length("password", &self.password, 8, 255)
            .length("name", &self.name, 1, 50)
            .length("student_number", &self.student_number, 1, 20)
            .max_len("profile_image", self.profile_image.as_deref(), 255)
            .length("phone_number", &self.phone_number, 1, 20)
            .email("email", &self.email)
            .max_len("major", Some(&self.major), 100)
            .ensure(
                parse_date("birth_date", &self.birth_date).is_ok(),
                "birth_date must be a valid ISO 8601 date string",
            )
            .max_len("current_company", self.current_company.as_deref(), 255)
            .max_len("baekjoon_username", self.baekjoon_username.as_deref(), 255)
            .max_len("github_username", self.github_username.as_deref(), 255)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<()> {
        Check::new()
            .length("username", &self.username, 3, 50)
            .length("password", &self.password, 8, 255)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: SanitizedUser,
    pub access_token: String,
}

/// The authenticated caller, as resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct AuthService {
    store: Arc<Store>,
    hasher: Hasher,
    signer: TokenSigner,
    /// Verified against when the username is unknown, so that a miss costs
    /// the same argon2 work as a wrong password.
    dummy_hash: Arc<str>,
}

impl AuthService {
    pub fn new(store: Arc<Store>, hasher: Hasher, signer: TokenSigner) -> Self {
        let dummy_hash = hasher.hash(&random_secret()).unwrap_or_default();
        Self {
            store,
            hasher,
            signer,
            dummy_hash: dummy_hash.into(),
        }
    }

    pub fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        req.validate()?;
        let birth_date = parse_date("birth_date", &req.birth_date)?;
        let password_hash = self.hasher.hash(&req.password)?;
        let now = Utc::now();

        let user = self.store.write(|tx| {
            ensure_unique_identity(tx, &req.username, &req.email, &req.student_number, None)?;
            tx.insert(|id| User {
                id,
                username: req.username,
                password_hash,
                name: req.name,
                student_number: req.student_number,
                profile_image: req
                    .profile_image
                    .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.to_string()),
                phone_number: req.phone_number,
                email: req.email,
                major: req.major,
                join_year: req.join_year,
                birth_date,
                gender: req.gender,
                tech_stack: req.tech_stack,
                education_status: req.education_status,
                current_company: req.current_company,
                baekjoon_username: req.baekjoon_username,
                github_username: req.github_username,
                self_description: req.self_description,
                portfolio_link: req.portfolio_link,
                is_public_current_company: req.is_public_current_company.unwrap_or(false),
                is_public_github_username: req.is_public_github_username.unwrap_or(false),
                is_public_baekjoon_username: req.is_public_baekjoon_username.unwrap_or(false),
                is_public_email: req.is_public_email.unwrap_or(false),
                is_public_tech_stack: req.is_public_tech_stack.unwrap_or(false),
                is_public_education_status: req.is_public_education_status.unwrap_or(false),
                is_public_portfolio_link: req.is_public_portfolio_link.unwrap_or(false),
                is_admin: false,
                created_at: now,
                updated_at: now,
            })
        })?;

        self.respond(&user)
    }

    /// Unknown user and wrong password fail identically.
    pub fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let invalid = || StceError::unauthorized("invalid credentials");
        req.validate().map_err(|_| invalid())?;

        let found = self
            .store
            .read(|tx| tx.find_first::<User>(|u| u.username == req.username))?;
        let Some(user) = found else {
            let _ = self.hasher.verify(&req.password, &self.dummy_hash);
            return Err(invalid());
        };
        if !self.hasher.verify(&req.password, &user.password_hash)? {
            return Err(invalid());
        }
        self.respond(&user)
    }

    /// Resolve a bearer token to its user. The admin flag is read from the
    /// store, not the token, so promotion and removal apply immediately.
    pub fn authenticate(&self, token: &str) -> Result<Actor> {
        let claims = self.signer.verify(token, Utc::now())?;
        let user = self
            .store
            .read(|tx| tx.get::<User>(claims.sub))?
            .ok_or_else(|| StceError::unauthorized("user no longer exists"))?;
        Ok(Actor {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }

    fn respond(&self, user: &User) -> Result<AuthResponse> {
        let access_token = self.signer.issue(user.id, &user.username, Utc::now())?;
        Ok(AuthResponse {
            user: user.sanitized(),
            access_token,
        })
    }
}

/// Reject a username, email or student number already held by a user other
/// than `except`.
pub(crate) fn ensure_unique_identity(
    tx: &impl Reader,
    username: &str,
    email: &str,
    student_number: &str,
    except: Option<UserId>,
) -> Result<()> {
    let others = tx.find::<User>(|u| Some(u.id) != except)?;
    if others.iter().any(|u| u.username == username) {
        return Err(StceError::conflict("username already exists"));
    }
    if others.iter().any(|u| u.email == email) {
        return Err(StceError::conflict("email already exists"));
    }
    if others.iter().any(|u| u.student_number == student_number) {
        return Err(StceError::conflict("student number already exists"));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
