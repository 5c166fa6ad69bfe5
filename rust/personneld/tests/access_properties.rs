use personneld::auth::{authenticate, AllowedRoles, AuthError, ModuleGrants, Screen};
use personneld::catalog::{Module, Role};
use personneld::roster::parse_roster;

const CSV: &str = "teacher_id,name,email,department,pin,role,admin_modules\n\
T001,Teacher One,t1@school.test,Science,PiN-9,teacher,\n\
M001,Leave Admin,m1@school.test,Office,2468,module_admin,\"leave,awards\"\n";

#[test]
fn every_absent_identifier_is_user_not_found() {
    let roster = parse_roster(CSV);
    let allowed = AllowedRoles::Only(vec![Role::Teacher]);
    for n in 0..200 {
        let id = format!("X{:04}", n);
        assert!(matches!(
            authenticate(&roster, &id, "PiN-9", &allowed),
            Err(AuthError::UserNotFound)
        ));
    }
}

#[test]
fn whitespace_is_ignored_but_case_is_not() {
    let roster = parse_roster(CSV);
    let allowed = Screen::User.allowed_roles();
    for secret in ["PiN-9", " PiN-9", "PiN-9 ", "\tPiN-9\n"] {
        assert!(authenticate(&roster, "T001", secret, &allowed).is_ok(), "{secret:?}");
    }
    for secret in ["pin-9", "PIN-9", "PiN9", "PiN-9x"] {
        assert!(
            matches!(
                authenticate(&roster, "T001", secret, &allowed),
                Err(AuthError::InvalidSecret)
            ),
            "{secret:?}"
        );
    }
}

#[test]
fn correct_credentials_with_wrong_role_are_rejected() {
    let roster = parse_roster(CSV);
    let only_admins = AllowedRoles::Only(vec![Role::SuperAdmin]);
    assert!(matches!(
        authenticate(&roster, "M001", "2468", &only_admins),
        Err(AuthError::InsufficientPrivilege)
    ));
    assert!(authenticate(&roster, "M001", "2468", &AllowedRoles::AnyAdmin).is_ok());
}

#[test]
fn leave_and_awards_admin_is_denied_promotion() {
    let roster = parse_roster(CSV);
    let record = authenticate(&roster, "M001", "2468", &AllowedRoles::AnyAdmin).unwrap();
    let grants = ModuleGrants::for_record(&record);
    assert!(grants.permits(Module::Leave));
    assert!(!grants.permits(Module::Promotion));
}
