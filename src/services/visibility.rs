use crate::models::VisibilityRule;
use super::auth_service::{Principal, Role};

/// Whether `principal` may take the edit lock of a project with these rules.
///
/// Admins always may. Without rules every user may. An individual grant
/// always wins; otherwise any admin-level rule locks users out, and a
/// role-wide user or viewer rule lets users in.
pub fn can_edit_project(principal: &Principal, rules: &[VisibilityRule]) -> bool {
    if principal.role == Role::Admin {
        return true;
    }
    if rules.is_empty() {
        return principal.role == Role::User;
    }
    if rules.iter().any(|r| r.user.as_deref() == Some(principal.username.as_str())) {
        return true;
    }
    if rules.iter().any(|r| r.role == Role::Admin) {
        return false;
    }
    principal.role == Role::User
        && rules
            .iter()
            .any(|r| r.user.is_none() && matches!(r.role, Role::User | Role::Viewer))
}

/// Whether `principal` may find a project with these rules in listings
pub fn can_see_project(principal: &Principal, rules: &[VisibilityRule]) -> bool {
    if rules.is_empty() || principal.role == Role::Admin {
        return true;
    }
    if rules.iter().any(|r| r.user.as_deref() == Some(principal.username.as_str())) {
        return true;
    }
    rules.iter().any(|r| r.user.is_none() && r.role <= principal.role)
}
