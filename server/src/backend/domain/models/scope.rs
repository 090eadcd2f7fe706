//! What a code or story is attached to: a goal or an organization, never both.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Goal(i64),
    Organization(i64),
}

impl Scope {
    /// Build a scope from the two nullable ids used on the wire and in storage.
    /// Returns `None` unless exactly one of them is set.
    pub fn from_ids(goal_id: Option<i64>, organization_id: Option<i64>) -> Option<Self> {
        match (goal_id, organization_id) {
            (Some(goal_id), None) => Some(Scope::Goal(goal_id)),
            (None, Some(organization_id)) => Some(Scope::Organization(organization_id)),
            _ => None,
        }
    }

    pub fn goal_id(&self) -> Option<i64> {
        match self {
            Scope::Goal(id) => Some(*id),
            Scope::Organization(_) => None,
        }
    }

    pub fn organization_id(&self) -> Option<i64> {
        match self {
            Scope::Goal(_) => None,
            Scope::Organization(id) => Some(*id),
        }
    }

    /// Numeric tag used in code values: 1 = goal, 2 = organization
    pub fn type_tag(&self) -> u8 {
        match self {
            Scope::Goal(_) => 1,
            Scope::Organization(_) => 2,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Scope::Goal(id) | Scope::Organization(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_id_is_required() {
        assert_eq!(Scope::from_ids(Some(42), None), Some(Scope::Goal(42)));
        assert_eq!(Scope::from_ids(None, Some(8)), Some(Scope::Organization(8)));
        assert_eq!(Scope::from_ids(Some(1), Some(2)), None);
        assert_eq!(Scope::from_ids(None, None), None);
    }

    #[test]
    fn accessors_split_the_union() {
        let scope = Scope::Goal(42);
        assert_eq!(scope.goal_id(), Some(42));
        assert_eq!(scope.organization_id(), None);
        assert_eq!(scope.type_tag(), 1);
        assert_eq!(Scope::Organization(3).type_tag(), 2);
    }
}
