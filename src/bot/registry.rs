//! Membership registry
//!
//! Tracks who has been approved, indexes usernames to user ids, and parks
//! applications awaiting the administrator's decision. Everything is
//! in-memory and process-scoped; the durable record of an approval is the
//! spreadsheet row written by the approval workflow.

use crate::bot::state::{Gender, Role};
use crate::transport::UserRef;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// A completed application waiting for an admin decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingApplication {
    /// Applicant user id
    pub user_id: i64,
    /// Applicant username, or the literal "нет username"
    pub username: String,
    /// Full name as entered
    pub full_name: String,
    /// Birthday as entered, free text
    pub birthday: String,
    /// Phone number as entered, free text
    pub phone: String,
    /// Chosen gender
    pub gender: Gender,
    /// Chosen role
    pub role: Role,
}

/// Approved users, username index, and pending applications
pub struct MembershipRegistry {
    approved: RwLock<HashSet<i64>>,
    usernames: RwLock<HashMap<String, i64>>,
    pending: RwLock<HashMap<i64, PendingApplication>>,
}

impl MembershipRegistry {
    /// Create a registry with the administrator pre-approved
    #[must_use]
    pub fn new(admin_id: i64) -> Self {
        let mut approved = HashSet::new();
        approved.insert(admin_id);
        Self {
            approved: RwLock::new(approved),
            usernames: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the user may enter member-only dialogs
    pub async fn is_approved(&self, user_id: i64) -> bool {
        let approved = self.approved.read().await;
        approved.contains(&user_id)
    }

    /// Mark a user approved
    pub async fn insert_approved(&self, user_id: i64) {
        let mut approved = self.approved.write().await;
        approved.insert(user_id);
    }

    /// Record the user's current username, when they have one
    pub async fn note_username(&self, user: &UserRef) {
        if let Some(username) = &user.username {
            let mut usernames = self.usernames.write().await;
            usernames.insert(username.clone(), user.id);
        }
    }

    /// Resolve a username recorded by [`Self::note_username`]
    pub async fn lookup_by_username(&self, username: &str) -> Option<i64> {
        let usernames = self.usernames.read().await;
        usernames.get(username).copied()
    }

    /// Park an application for decision, replacing any prior one by this user
    pub async fn submit(&self, application: PendingApplication) {
        let mut pending = self.pending.write().await;
        pending.insert(application.user_id, application);
    }

    /// Take the user's pending application out of the registry
    pub async fn take_pending(&self, user_id: i64) -> Option<PendingApplication> {
        let mut pending = self.pending.write().await;
        pending.remove(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(user_id: i64, full_name: &str) -> PendingApplication {
        PendingApplication {
            user_id,
            username: "anna".to_string(),
            full_name: full_name.to_string(),
            birthday: "01.01.2000".to_string(),
            phone: "+70000000000".to_string(),
            gender: Gender::Female,
            role: Role::Magistr,
        }
    }

    #[tokio::test]
    async fn test_admin_is_seeded_approved() {
        let registry = MembershipRegistry::new(42);
        assert!(registry.is_approved(42).await);
        assert!(!registry.is_approved(7).await);

        registry.insert_approved(7).await;
        assert!(registry.is_approved(7).await);
    }

    #[tokio::test]
    async fn test_resubmission_overwrites_pending() {
        let registry = MembershipRegistry::new(42);
        registry.submit(application(7, "Анна Иванова")).await;
        registry.submit(application(7, "Анна Петрова")).await;

        let taken = registry.take_pending(7).await;
        assert_eq!(taken.map(|a| a.full_name), Some("Анна Петрова".to_string()));

        // The overwrite left a single application behind
        assert!(registry.take_pending(7).await.is_none());
    }

    #[tokio::test]
    async fn test_username_index_is_opportunistic() {
        let registry = MembershipRegistry::new(42);

        let named = UserRef {
            id: 7,
            username: Some("anna".to_string()),
        };
        let nameless = UserRef {
            id: 8,
            username: None,
        };
        registry.note_username(&named).await;
        registry.note_username(&nameless).await;

        assert_eq!(registry.lookup_by_username("anna").await, Some(7));
        assert_eq!(registry.lookup_by_username("missing").await, None);
    }
}
