//! Role-based access control, evaluated per data-type prefix (spec
//! section 4.2).

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Read,
    Write,
    Admin,
}

impl Role {
    /// ADMIN implies WRITE implies READ (spec section 4.2 lists the three
    /// roles without stating a hierarchy; a node operator granted ADMIN
    /// on a prefix is assumed able to exercise the lesser roles too).
    #[must_use]
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    fn required_role(self) -> Role {
        match self {
            Permission::Read => Role::Read,
            Permission::Write | Permission::Delete => Role::Write,
        }
    }
}

/// A caller's grants across data-type prefixes. `Principal::anonymous()`
/// holds no grants, for the dev-profile "unauthenticated" path.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    grants: HashMap<String, Role>,
    /// Dev-profile bypass: every permission check succeeds regardless of
    /// grants (spec section 4.2: "unauthenticated access is ... permitted
    /// in dev profile").
    unrestricted: bool,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), grants: HashMap::new(), unrestricted: false }
    }

    #[must_use]
    pub fn unrestricted(id: impl Into<String>) -> Self {
        Self { id: id.into(), grants: HashMap::new(), unrestricted: true }
    }

    #[must_use]
    pub fn grant(mut self, prefix: impl Into<String>, role: Role) -> Self {
        self.grants.insert(prefix.into(), role);
        self
    }

    /// Whether this principal may exercise `permission` against a key
    /// whose data-type prefix is `prefix`.
    #[must_use]
    pub fn is_authorized(&self, prefix: &str, permission: Permission) -> bool {
        if self.unrestricted {
            return true;
        }
        self.grants.get(prefix).is_some_and(|role| role.satisfies(permission.required_role()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_lesser_roles() {
        assert!(Role::Admin.satisfies(Role::Write));
        assert!(Role::Admin.satisfies(Role::Read));
        assert!(!Role::Read.satisfies(Role::Write));
    }

    #[test]
    fn write_grant_allows_read_and_write_not_admin_only_actions() {
        let principal = Principal::new("svc").grant("token", Role::Write);
        assert!(principal.is_authorized("token", Permission::Read));
        assert!(principal.is_authorized("token", Permission::Write));
        assert!(!principal.is_authorized("balance", Permission::Read));
    }

    #[test]
    fn unrestricted_principal_bypasses_grants() {
        let principal = Principal::unrestricted("dev");
        assert!(principal.is_authorized("anything", Permission::Delete));
    }
}
