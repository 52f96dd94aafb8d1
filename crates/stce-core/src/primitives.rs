//! # Primitives
//!
//! Typed row identifiers. Every table is keyed by a `u64` drawn from a
//! per-table sequence; the newtypes keep a `TeamId` from being passed where a
//! `UserId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(raw: u64) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for u64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )*
    };
}

row_id!(
    /// Identifies a registered member.
    UserId,
    AnnouncementId,
    TeamId,
    TeamRoleId,
    TeamMemberId,
    StudyId,
    /// Identifies a (study, user) role row, including the Leader row.
    StudyRoleId,
    ProgressId,
    ResourceId,
);

/// Role name that marks the leader of a study.
pub const STUDY_LEADER_ROLE: &str = "Leader";

/// Profile image assigned when registration does not provide one.
pub const DEFAULT_PROFILE_IMAGE: &str = "default_profile_image.png";
