//! Read-permission predicate and permission checks.
//!
//! The core never reaches into ambient security state: the deciding predicate,
//! the current user and the organization set are all passed in explicitly at
//! construction time. During traversal `can_read` is invoked once per candidate
//! edge, synchronously on the traversal worker, so implementations must be
//! side-effect-free and cheap.

use std::collections::HashSet;

use crate::error::AccessError;
use crate::model::{AccessMode, Fact, OrganizationId, UserId};

/// Named permission functions checked on lifecycle and traversal entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionFunction {
    /// Execute traversal queries over the projected graph.
    TraverseGraph,
    /// Create or retract Facts for an organization.
    AddFact,
}

impl std::fmt::Display for PermissionFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionFunction::TraverseGraph => write!(f, "traverseGraph"),
            PermissionFunction::AddFact => write!(f, "addFact"),
        }
    }
}

/// The caller-supplied access decision interface.
pub trait AccessDecider: Send + Sync {
    /// The user on whose behalf operations run.
    fn current_user(&self) -> UserId;

    /// Whether the current user may read the given Fact.
    fn can_read(&self, fact: &Fact) -> bool;

    /// Whether the current user may execute the given function, optionally
    /// scoped to an organization.
    fn can_execute(&self, function: PermissionFunction, organization: Option<OrganizationId>)
    -> bool;

    /// Fail with [`AccessError`] unless the Fact is readable.
    fn check_read(&self, fact: &Fact) -> Result<(), AccessError> {
        if self.can_read(fact) {
            Ok(())
        } else {
            Err(AccessError::denied(format!(
                "no read access to fact {}",
                fact.id
            )))
        }
    }

    /// Fail with [`AccessError`] unless the function may be executed.
    fn check_permission(
        &self,
        function: PermissionFunction,
        organization: Option<OrganizationId>,
    ) -> Result<(), AccessError> {
        if self.can_execute(function, organization) {
            Ok(())
        } else {
            Err(AccessError::denied(format!(
                "user is not permitted to {function}"
            )))
        }
    }
}

/// Decider granting everything. Useful for tests and trusted embedded use.
#[derive(Debug, Clone)]
pub struct AllowAll {
    user: UserId,
}

impl AllowAll {
    pub fn new(user: UserId) -> Self {
        AllowAll { user }
    }
}

impl AccessDecider for AllowAll {
    fn current_user(&self) -> UserId {
        self.user
    }

    fn can_read(&self, _fact: &Fact) -> bool {
        true
    }

    fn can_execute(
        &self,
        _function: PermissionFunction,
        _organization: Option<OrganizationId>,
    ) -> bool {
        true
    }
}

/// Reference decider resolving access from the Fact's access mode:
///
/// - `Public` facts are readable by everyone
/// - `RoleBased` facts require membership in the owning organization
/// - `Explicit` facts require an ACL grant (the creator always has one
///   implicitly)
#[derive(Debug, Clone)]
pub struct SubjectAccess {
    user: UserId,
    organizations: HashSet<OrganizationId>,
    functions: HashSet<PermissionFunction>,
}

impl SubjectAccess {
    /// A decider for `user` with the given organization memberships, allowed
    /// to execute every function.
    pub fn new(user: UserId, organizations: impl IntoIterator<Item = OrganizationId>) -> Self {
        SubjectAccess {
            user,
            organizations: organizations.into_iter().collect(),
            functions: [
                PermissionFunction::TraverseGraph,
                PermissionFunction::AddFact,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Restrict the executable functions.
    pub fn with_functions(
        mut self,
        functions: impl IntoIterator<Item = PermissionFunction>,
    ) -> Self {
        self.functions = functions.into_iter().collect();
        self
    }
}

impl AccessDecider for SubjectAccess {
    fn current_user(&self) -> UserId {
        self.user
    }

    fn can_read(&self, fact: &Fact) -> bool {
        match fact.access_mode {
            AccessMode::Public => true,
            AccessMode::RoleBased => self.organizations.contains(&fact.organization),
            AccessMode::Explicit => {
                fact.added_by == self.user || fact.acl.iter().any(|e| e.subject == self.user)
            }
        }
    }

    fn can_execute(
        &self,
        function: PermissionFunction,
        organization: Option<OrganizationId>,
    ) -> bool {
        if !self.functions.contains(&function) {
            return false;
        }
        match organization {
            Some(org) => self.organizations.contains(&org),
            None => true,
        }
    }
}
