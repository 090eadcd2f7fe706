//! Caller identity as resolved from a bearer credential.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Platform administrator
    Admin,
    /// Administrator of one organization
    OrgAdmin,
    Consumer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OrgAdmin => "org.admin",
            Role::Consumer => "consumer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "org.admin" => Some(Role::OrgAdmin),
            "consumer" => Some(Role::Consumer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub role: Role,
    pub organization_id: Option<i64>,
}

impl User {
    pub fn is_platform_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Organization this user administers, if any
    pub fn administered_organization(&self) -> Option<i64> {
        match self.role {
            Role::OrgAdmin => self.organization_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_org_admins_administer_an_organization() {
        let staff = User { id: 1, role: Role::OrgAdmin, organization_id: Some(5) };
        let consumer = User { id: 2, role: Role::Consumer, organization_id: Some(5) };

        assert_eq!(staff.administered_organization(), Some(5));
        assert_eq!(consumer.administered_organization(), None);
        assert!(!staff.is_platform_admin());
    }

    #[test]
    fn role_names_match_storage() {
        assert_eq!(Role::parse("org.admin"), Some(Role::OrgAdmin));
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::parse("root"), None);
    }
}
