use crate::primitives::UserId;
use crate::storage::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationStatus {
    Enrolled,
    LeaveOfAbsence,
    Graduated,
}

/// A registered member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// argon2id PHC string.
    pub password_hash: String,
    pub name: String,
    pub student_number: String,
    pub profile_image: String,
    pub phone_number: String,
    pub email: String,
    pub major: String,
    pub join_year: i16,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub tech_stack: Option<Vec<String>>,
    pub education_status: EducationStatus,
    pub current_company: Option<String>,
    pub baekjoon_username: Option<String>,
    pub github_username: Option<String>,
    pub self_description: Option<String>,
    pub portfolio_link: Option<String>,
    pub is_public_current_company: bool,
    pub is_public_github_username: bool,
    pub is_public_baekjoon_username: bool,
    pub is_public_email: bool,
    pub is_public_tech_stack: bool,
    pub is_public_education_status: bool,
    pub is_public_portfolio_link: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for User {
    type Id = UserId;
    const TABLE: &'static str = "users";

    fn id(&self) -> UserId {
        self.id
    }
}

impl User {
    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            student_number: self.student_number.clone(),
            profile_image: self.profile_image.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }

    /// Directory card honoring the member's visibility flags.
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            name: self.name.clone(),
            profile_image: self.profile_image.clone(),
            self_description: self.self_description.clone(),
            email: self.is_public_email.then(|| self.email.clone()),
            tech_stack: if self.is_public_tech_stack {
                Some(self.tech_stack.clone())
            } else {
                None
            },
            education_status: self
                .is_public_education_status
                .then_some(self.education_status),
            github_username: if self.is_public_github_username {
                Some(self.github_username.clone())
            } else {
                None
            },
            portfolio_link: if self.is_public_portfolio_link {
                Some(self.portfolio_link.clone())
            } else {
                None
            },
        }
    }

    /// Everything except the password hash, for administrators.
    pub fn profile(&self) -> MemberProfile {
        MemberProfile {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            student_number: self.student_number.clone(),
            profile_image: self.profile_image.clone(),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            major: self.major.clone(),
            join_year: self.join_year,
            birth_date: self.birth_date,
            gender: self.gender,
            tech_stack: self.tech_stack.clone(),
            education_status: self.education_status,
            current_company: self.current_company.clone(),
            baekjoon_username: self.baekjoon_username.clone(),
            github_username: self.github_username.clone(),
            self_description: self.self_description.clone(),
            portfolio_link: self.portfolio_link.clone(),
            is_public_current_company: self.is_public_current_company,
            is_public_github_username: self.is_public_github_username,
            is_public_baekjoon_username: self.is_public_baekjoon_username,
            is_public_email: self.is_public_email,
            is_public_tech_stack: self.is_public_tech_stack,
            is_public_education_status: self.is_public_education_status,
            is_public_portfolio_link: self.is_public_portfolio_link,
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Account view returned by register/login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedUser {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub student_number: String,
    pub profile_image: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal author/leader reference embedded in other views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub name: String,
}

/// Public directory card. Keys whose visibility flag is off are omitted
/// entirely; a visible-but-empty value serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub name: String,
    pub profile_image: String,
    pub self_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_status: Option<EducationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_username: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_link: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub student_number: String,
    pub profile_image: String,
    pub phone_number: String,
    pub email: String,
    pub major: String,
    pub join_year: i16,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub tech_stack: Option<Vec<String>>,
    pub education_status: EducationStatus,
    pub current_company: Option<String>,
    pub baekjoon_username: Option<String>,
    pub github_username: Option<String>,
    pub self_description: Option<String>,
    pub portfolio_link: Option<String>,
    pub is_public_current_company: bool,
    pub is_public_github_username: bool,
    pub is_public_baekjoon_username: bool,
    pub is_public_email: bool,
    pub is_public_tech_stack: bool,
    pub is_public_education_status: bool,
    pub is_public_portfolio_link: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
