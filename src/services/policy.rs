//! Who may do what. Knowing an opaque id grants nothing: every route checks
//! the caller's scope here.

use super::error::{ServiceError, ServiceResult};
use crate::auth::{Principal, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    /// Read one user's permission tree.
    ReadTree { user_id: i64 },
}

pub fn authorize(principal: &Principal, action: Action) -> ServiceResult<()> {
    let allowed = match (principal.scope, action) {
        (Scope::Admin, _) => true,
        (Scope::Read, Action::Read | Action::ReadTree { .. }) => true,
        (Scope::Read, Action::Write) => false,
        (Scope::SelfOnly, Action::ReadTree { user_id }) => principal.user_id() == Some(user_id),
        (Scope::SelfOnly, _) => false,
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            "Denied {:?} for subject {} with scope {:?}",
            action,
            principal.subject,
            principal.scope
        );
        Err(ServiceError::Forbidden(format!(
            "scope {:?} does not allow this operation",
            principal.scope
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn principal(subject: &str, scope: Scope) -> Principal {
        Principal {
            subject: subject.to_string(),
            scope,
        }
    }

    #[test]
    fn admin_may_do_everything() {
        let p = principal("ops", Scope::Admin);
        assert!(authorize(&p, Action::Read).is_ok());
        assert!(authorize(&p, Action::Write).is_ok());
        assert!(authorize(&p, Action::ReadTree { user_id: 9 }).is_ok());
    }

    #[test]
    fn read_scope_cannot_write() {
        let p = principal("reporting", Scope::Read);
        assert!(authorize(&p, Action::Read).is_ok());
        assert!(matches!(authorize(&p, Action::Write), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn self_scope_reads_only_its_own_tree() {
        let p = principal(&codec::encode(7), Scope::SelfOnly);
        assert!(authorize(&p, Action::ReadTree { user_id: 7 }).is_ok());
        assert!(authorize(&p, Action::ReadTree { user_id: 8 }).is_err());
        assert!(authorize(&p, Action::Read).is_err());
    }

    #[test]
    fn guessing_an_opaque_id_is_not_enough() {
        // a non-user subject never matches a user's tree
        let p = principal("not-a-user", Scope::SelfOnly);
        assert!(authorize(&p, Action::ReadTree { user_id: 1 }).is_err());
    }
}
