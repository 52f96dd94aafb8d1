//! Public member directory.

use crate::error::Result;
use crate::model::{PublicUser, User};
use crate::storage::{Reader, Store};
use std::sync::Arc;

#[derive(Clone)]
pub struct MemberService {
    store: Arc<Store>,
}

impl MemberService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Every member's public card, in registration order.
    pub fn public_member_list(&self) -> Result<Vec<PublicUser>> {
        let users = self.store.read(|tx| tx.scan::<User>())?;
        Ok(users.iter().map(User::public_view).collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::auth::tests::seed_user;
    use crate::model::memory_store;

    #[test]
    fn hidden_fields_are_absent_from_json() {
        let store = Arc::new(memory_store().unwrap());
        seed_user(&store, "shy", false);
        let open = seed_user(&store, "open", false);
        store
            .write(|tx| {
                let mut user = tx.get::<User>(open)?.unwrap();
                user.is_public_email = true;
                user.is_public_github_username = true;
                user.self_description = Some("hello".to_string());
                tx.put(&user)
            })
            .unwrap();

        let list = MemberService::new(store).public_member_list().unwrap();
        assert_eq!(list.len(), 2);

        let json = serde_json::to_value(&list).unwrap();
        let shy_card = json[0].as_object().unwrap();
        assert_eq!(shy_card["name"], "shy name");
        for key in ["email", "tech_stack", "education_status", "github_username", "portfolio_link"] {
            assert!(!shy_card.contains_key(key), "{key} leaked");
        }
        assert!(shy_card.contains_key("self_description"));

        let open_card = json[1].as_object().unwrap();
        assert_eq!(open_card["email"], "open@example.com");
        assert!(open_card["github_username"].is_null());
        assert_eq!(open_card["self_description"], "hello");
        assert!(!open_card.contains_key("tech_stack"));
    }
}
