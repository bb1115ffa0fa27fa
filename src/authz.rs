//! Authorization policy: one declarative capability table evaluated by a
//! single dispatcher, plus the volatile ghost-mode registry.
//!
//! Adding a capability means adding an enum variant and one table row in
//! `requirement`, nothing else.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateThread,
    CreatePost,
    EditThread,
    DeleteThread,
    EditPost,
    DeletePost,
    LockThread,
    UnlockThread,
    PinThread,
    UnpinThread,
    ManageUsers,
    ViewModerationLogs,
    AccessAdminPanel,
    GhostMode,
}

/// What a capability demands of the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    /// Any account not currently locked
    NotLocked,
    /// Admin, or the actor owns the resource
    AdminOrOwner,
    /// Admin only
    AdminOnly,
}

/// The capability table
fn requirement(capability: Capability) -> Requirement {
    use Capability::*;
    match capability {
        CreateThread | CreatePost => Requirement::NotLocked,
        EditThread | DeleteThread | EditPost | DeletePost => Requirement::AdminOrOwner,
        LockThread | UnlockThread | PinThread | UnpinThread => Requirement::AdminOnly,
        ManageUsers | ViewModerationLogs | AccessAdminPanel | GhostMode => Requirement::AdminOnly,
    }
}

/// Pure predicate over (actor, capability, resource owner).
/// `owner` is only consulted for ownership-gated capabilities.
pub fn allows(actor: &User, capability: Capability, owner: Option<&str>) -> bool {
    match requirement(capability) {
        Requirement::NotLocked => !actor.lock_in_force(Utc::now()),
        Requirement::AdminOrOwner => {
            actor.is_admin() || owner.map(|o| o == actor.id).unwrap_or(false)
        }
        Requirement::AdminOnly => actor.is_admin(),
    }
}

/// Fail-closed check used by every mutating handler
pub fn require(actor: &User, capability: Capability, owner: Option<&str>) -> Result<()> {
    if allows(actor, capability, owner) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions".to_string()))
    }
}

/// Ghost-mode registry: process-wide set of admin ids whose presence is
/// hidden from online-user listings. Volatile: resets on restart, never
/// persisted. Injected through AppState, not a global.
#[derive(Clone, Default)]
pub struct GhostRegistry {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl GhostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: enabling twice is a no-op
    pub fn enable(&self, user_id: &str) {
        self.inner
            .write()
            .expect("ghost registry lock poisoned")
            .insert(user_id.to_string());
    }

    /// Idempotent: disabling a non-member is a no-op
    pub fn disable(&self, user_id: &str) {
        self.inner
            .write()
            .expect("ghost registry lock poisoned")
            .remove(user_id);
    }

    pub fn is_ghost(&self, user_id: &str) -> bool {
        self.inner
            .read()
            .expect("ghost registry lock poisoned")
            .contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn user(id: &str) -> User {
        let mut u = User::new(format!("user_{id}"), format!("{id}@x.com"), "digest".into());
        u.id = id.to_string();
        u
    }

    fn admin(id: &str) -> User {
        let mut u = user(id);
        u.role = Role::Admin;
        u
    }

    #[test]
    fn test_locked_user_cannot_create() {
        let mut u = user("u1");
        assert!(allows(&u, Capability::CreateThread, None));
        assert!(allows(&u, Capability::CreatePost, None));

        u.is_locked = true;
        u.lock_expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(!allows(&u, Capability::CreateThread, None));
        assert!(!allows(&u, Capability::CreatePost, None));
    }

    #[test]
    fn test_stale_lock_does_not_block_creation() {
        let mut u = user("u1");
        u.is_locked = true;
        u.lock_expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(allows(&u, Capability::CreatePost, None));
    }

    #[test]
    fn test_ownership_matrix() {
        let u = user("u1");
        let v = user("v1");
        let a = admin("a1");

        // Non-admin on someone else's post: denied
        assert!(!allows(&u, Capability::EditPost, Some(&v.id)));
        assert!(!allows(&u, Capability::DeletePost, Some(&v.id)));
        // Own post: allowed
        assert!(allows(&u, Capability::EditPost, Some(&u.id)));
        assert!(allows(&u, Capability::DeletePost, Some(&u.id)));
        // Admin: allowed on both
        assert!(allows(&a, Capability::EditPost, Some(&u.id)));
        assert!(allows(&a, Capability::DeletePost, Some(&v.id)));
        // No owner context means only admins pass
        assert!(!allows(&u, Capability::EditThread, None));
        assert!(allows(&a, Capability::EditThread, None));
    }

    #[test]
    fn test_admin_only_capabilities() {
        let u = user("u1");
        let a = admin("a1");
        for cap in [
            Capability::LockThread,
            Capability::UnlockThread,
            Capability::PinThread,
            Capability::UnpinThread,
            Capability::ManageUsers,
            Capability::ViewModerationLogs,
            Capability::AccessAdminPanel,
            Capability::GhostMode,
        ] {
            assert!(!allows(&u, cap, None), "{cap:?} should be admin only");
            assert!(allows(&a, cap, None), "{cap:?} should pass for admin");
        }
    }

    #[test]
    fn test_require_fails_closed() {
        let u = user("u1");
        assert!(matches!(
            require(&u, Capability::ManageUsers, None).unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[test]
    fn test_ghost_registry_truth_table_and_idempotence() {
        let registry = GhostRegistry::new();
        assert!(!registry.is_ghost("a1"));

        registry.enable("a1");
        assert!(registry.is_ghost("a1"));
        registry.enable("a1");
        assert!(registry.is_ghost("a1"));

        registry.disable("a1");
        assert!(!registry.is_ghost("a1"));
        registry.disable("a1");
        assert!(!registry.is_ghost("a1"));
    }

    #[test]
    fn test_ghost_registry_concurrent_updates() {
        let registry = GhostRegistry::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                let id = format!("admin-{}", i % 4);
                registry.enable(&id);
                assert!(registry.is_ghost(&id));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..4 {
            assert!(registry.is_ghost(&format!("admin-{i}")));
        }
    }
}
