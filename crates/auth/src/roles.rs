use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User category governing which views are reachable.
///
/// This is a closed set: the wire names are the backend's role identifiers.
/// Adding a variant forces every exhaustive `match` (notably the role guard)
/// to be revisited.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    NewUser,
    Learner,
    Mentor,
    Admin,
    SuperAdmin,
    Moderator,
    HrManager,
    Recruiter,
    PremiumUser,
    VipMentor,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 10] = [
        Role::NewUser,
        Role::Learner,
        Role::Mentor,
        Role::Admin,
        Role::SuperAdmin,
        Role::Moderator,
        Role::HrManager,
        Role::Recruiter,
        Role::PremiumUser,
        Role::VipMentor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::NewUser => "new_user",
            Role::Learner => "learner",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::Moderator => "moderator",
            Role::HrManager => "hr_manager",
            Role::Recruiter => "recruiter",
            Role::PremiumUser => "premium_user",
            Role::VipMentor => "vip_mentor",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The set of roles a page accepts.
///
/// Supplied by the page on each render pass; never stored by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleRequirement(BTreeSet<Role>);

impl RoleRequirement {
    pub fn any_of(roles: &[Role]) -> Self {
        Self(roles.iter().copied().collect())
    }

    /// Requirement of the super-admin dashboard.
    pub fn administrators() -> Self {
        Self::any_of(&[Role::Admin, Role::SuperAdmin])
    }

    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_serde_and_from_str() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!("root".parse::<Role>(), Err(UnknownRole("root".to_string())));
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn requirement_membership() {
        let req = RoleRequirement::administrators();
        assert!(req.allows(Role::Admin));
        assert!(req.allows(Role::SuperAdmin));
        assert!(!req.allows(Role::Moderator));
        assert_eq!(req, RoleRequirement::any_of(&[Role::SuperAdmin, Role::Admin, Role::Admin]));
    }
}
