//! Access control: credential lookup, screen gating and per-session module
//! grants.
//!
//! This is a low-assurance gate. PINs are compared as plain strings and there
//! is no lockout or rate limiting.

use crate::catalog::{Module, Role};
use crate::roster::{Roster, StoreError, UserRecord};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid PIN")]
    InvalidSecret,
    #[error("role is not permitted on this screen")]
    InsufficientPrivilege,
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::InvalidSecret => "invalid_secret",
            Self::InsufficientPrivilege => "insufficient_privilege",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AllowedRoles {
    Only(Vec<Role>),
    AnyAdmin,
}

impl AllowedRoles {
    pub fn permits(&self, role: &Role) -> bool {
        match self {
            Self::Only(roles) => roles.contains(role),
            Self::AnyAdmin => role.is_admin(),
        }
    }
}

/// Login screens and the roles each one accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    User,
    Admin,
}

impl Screen {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn allowed_roles(self) -> AllowedRoles {
        match self {
            Self::User => AllowedRoles::Only(vec![
                Role::Teacher,
                Role::ModuleAdmin,
                Role::SuperAdmin,
                Role::Executive,
            ]),
            Self::Admin => AllowedRoles::AnyAdmin,
        }
    }
}

pub fn authenticate(
    roster: &Roster,
    identifier: &str,
    secret: &str,
    allowed: &AllowedRoles,
) -> Result<UserRecord, AuthError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(AuthError::UserNotFound);
    }
    let record = roster.find(identifier).ok_or(AuthError::UserNotFound)?;
    if record.secret != secret.trim() {
        return Err(AuthError::InvalidSecret);
    }
    if !allowed.permits(&record.role) {
        return Err(AuthError::InsufficientPrivilege);
    }
    Ok(record.clone())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleGrants {
    All,
    Only(BTreeSet<String>),
}

impl ModuleGrants {
    /// Super admins get every module. Module admins get exactly what their
    /// record lists, so an empty list grants nothing. Other roles get nothing.
    pub fn for_record(record: &UserRecord) -> Self {
        match record.role {
            Role::SuperAdmin => Self::All,
            Role::ModuleAdmin => Self::Only(record.administered_modules().into_iter().collect()),
            _ => Self::Only(BTreeSet::new()),
        }
    }

    pub fn permits(&self, module: Module) -> bool {
        match self {
            Self::All => true,
            Self::Only(keys) => keys.contains(module.key()),
        }
    }

    /// Granted modules in catalog order. Unknown names in the record are
    /// ignored here.
    pub fn modules(&self) -> Vec<Module> {
        Module::ALL.into_iter().filter(|m| self.permits(*m)).collect()
    }
}

/// Free-text form data kept only for the lifetime of a session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub session_id: String,
    pub identifier: String,
    pub display_name: String,
    pub role: Role,
    pub grants: ModuleGrants,
    pub form: FormState,
}

impl SessionBinding {
    pub fn can_access(&self, module: Module) -> bool {
        self.grants.permits(module)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(SessionBinding),
}

impl Session {
    /// Runs `authenticate` and, on success, replaces the current binding.
    /// On failure the session is left as it was.
    pub fn login(
        &mut self,
        roster: &Roster,
        identifier: &str,
        secret: &str,
        screen: Screen,
    ) -> Result<&SessionBinding, AuthError> {
        let record = authenticate(roster, identifier, secret, &screen.allowed_roles())?;
        let binding = SessionBinding {
            session_id: uuid::Uuid::new_v4().to_string(),
            identifier: record.identifier.clone(),
            display_name: record.name.clone(),
            grants: ModuleGrants::for_record(&record),
            role: record.role,
            form: FormState::default(),
        };
        *self = Self::Authenticated(binding);
        let Self::Authenticated(b) = self else {
            unreachable!("binding was just set");
        };
        Ok(b)
    }

    pub fn logout(&mut self) {
        *self = Self::Anonymous;
    }

    pub fn binding(&self) -> Option<&SessionBinding> {
        match self {
            Self::Authenticated(b) => Some(b),
            Self::Anonymous => None,
        }
    }

    pub fn binding_mut(&mut self) -> Option<&mut SessionBinding> {
        match self {
            Self::Authenticated(b) => Some(b),
            Self::Anonymous => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Anonymous => json!({ "state": "anonymous" }),
            Self::Authenticated(b) => {
                let modules: Vec<&str> = b.grants.modules().iter().map(|m| m.key()).collect();
                json!({
                    "state": "authenticated",
                    "sessionId": b.session_id,
                    "identifier": b.identifier,
                    "displayName": b.display_name,
                    "role": b.role.as_str(),
                    "isAdmin": b.is_admin(),
                    "allModules": b.grants == ModuleGrants::All,
                    "modules": modules,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::parse_roster;

    fn roster() -> Roster {
        parse_roster(
            "teacher_id,name,email,department,pin,role,admin_modules\n\
             T001,Teacher One,t1@school.test,Science,1234,teacher,\n\
             M001,Module Admin,m1@school.test,Office,Ab12,module_admin,\"leave,awards\"\n\
             M002,Empty Admin,m2@school.test,Office,0000,module_admin,\n\
             S001,Super Admin,s1@school.test,Office,9999,SUPERADMIN,\n\
             X001,Guest,x@school.test,,1111,visitor,\n",
        )
    }

    #[test]
    fn unknown_identifier_is_user_not_found() {
        let r = roster();
        for id in ["", "   ", "T002", "t001", "nobody"] {
            let e = authenticate(&r, id, "1234", &Screen::User.allowed_roles()).unwrap_err();
            assert!(matches!(e, AuthError::UserNotFound), "{id}: {e:?}");
        }
    }

    #[test]
    fn secret_is_trimmed_but_case_sensitive() {
        let r = roster();
        let allowed = Screen::User.allowed_roles();
        assert!(authenticate(&r, "  M001 ", " Ab12\t", &allowed).is_ok());
        assert!(matches!(
            authenticate(&r, "M001", "ab12", &allowed),
            Err(AuthError::InvalidSecret)
        ));
        assert!(matches!(
            authenticate(&r, "T001", "", &allowed),
            Err(AuthError::InvalidSecret)
        ));
    }

    #[test]
    fn role_outside_screen_is_insufficient_privilege() {
        let r = roster();
        assert!(matches!(
            authenticate(&r, "T001", "1234", &Screen::Admin.allowed_roles()),
            Err(AuthError::InsufficientPrivilege)
        ));
        assert!(matches!(
            authenticate(&r, "X001", "1111", &Screen::User.allowed_roles()),
            Err(AuthError::InsufficientPrivilege)
        ));
        let s = authenticate(&r, "S001", "9999", &Screen::Admin.allowed_roles()).unwrap();
        assert_eq!(s.role, Role::SuperAdmin);
    }

    #[test]
    fn module_admin_is_limited_to_listed_modules() {
        let r = roster();
        let mut session = Session::default();
        let b = session.login(&r, "M001", "Ab12", Screen::Admin).unwrap();
        assert!(b.can_access(Module::Leave));
        assert!(b.can_access(Module::Awards));
        assert!(!b.can_access(Module::Promotion));
        assert_eq!(b.grants.modules(), vec![Module::Awards, Module::Leave]);
    }

    #[test]
    fn empty_module_list_grants_nothing_and_superadmin_gets_all() {
        let r = roster();
        let mut session = Session::default();
        let b = session.login(&r, "M002", "0000", Screen::Admin).unwrap();
        assert!(b.grants.modules().is_empty());

        let b = session.login(&r, "S001", "9999", Screen::Admin).unwrap();
        assert_eq!(b.grants, ModuleGrants::All);
        assert_eq!(b.grants.modules().len(), Module::ALL.len());
    }

    #[test]
    fn failed_login_keeps_session_and_logout_clears_it() {
        let r = roster();
        let mut session = Session::default();
        session.login(&r, "T001", "1234", Screen::User).unwrap();
        assert!(session.login(&r, "T001", "4321", Screen::User).is_err());
        assert_eq!(session.binding().map(|b| b.identifier.as_str()), Some("T001"));
        session.logout();
        assert!(session.binding().is_none());
        assert_eq!(session.to_json()["state"], "anonymous");
    }

    #[test]
    fn unreadable_roster_is_storage_unavailable() {
        use crate::roster::{CsvRoster, RosterSource};
        // A directory where the CSV should be fails with something other than NotFound.
        let e = CsvRoster::new(std::env::temp_dir())
            .load()
            .map_err(AuthError::from)
            .unwrap_err();
        assert!(matches!(e, AuthError::StorageUnavailable(_)));
        assert_eq!(e.code(), "storage_unavailable");
    }
}
