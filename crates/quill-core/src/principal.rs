//! Principals - who is asking for a channel or triggering an action

use crate::UserId;

/// Role of an authenticated user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Member,
    /// Elevated role: may edit any article
    Staff,
}

/// Request principal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Principal {
    /// No identity - public channels only, never rate tracked
    #[default]
    Anonymous,
    /// Authenticated user
    User { id: UserId, role: Role },
}

impl Principal {
    pub fn member(id: UserId) -> Self {
        Principal::User {
            id,
            role: Role::Member,
        }
    }

    pub fn staff(id: UserId) -> Self {
        Principal::User {
            id,
            role: Role::Staff,
        }
    }

    /// User id, if authenticated
    #[inline]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(*id),
        }
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User { .. })
    }

    #[inline]
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            Principal::User {
                role: Role::Staff,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let anon = Principal::Anonymous;
        let member = Principal::member(UserId::new(1));
        let staff = Principal::staff(UserId::new(2));

        assert!(!anon.is_authenticated());
        assert_eq!(anon.user_id(), None);
        assert!(member.is_authenticated());
        assert!(!member.is_staff());
        assert!(staff.is_staff());
        assert_eq!(staff.user_id(), Some(UserId::new(2)));
    }
}
