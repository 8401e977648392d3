//! Request principals and the centralized capability check.
//!
//! Every handler receives a `Principal` resolved by the upstream auth
//! collaborator. Role checks go through `Principal::can` so permission rules
//! live in exactly one place.

use serde::{Deserialize, Serialize};

/// Role attached to a principal by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Authorizer,
    Admin,
    FrontOffice,
    BackOfficeVerifier,
    BackOfficeFinal,
    LimitsAllocatingUser,
    LimitsAllocatingAuthorizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Authorizer => "authorizer",
            Role::Admin => "admin",
            Role::FrontOffice => "front_office",
            Role::BackOfficeVerifier => "back_office_verifier",
            Role::BackOfficeFinal => "back_office_final",
            Role::LimitsAllocatingUser => "limits_allocating_user",
            Role::LimitsAllocatingAuthorizer => "limits_allocating_authorizer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "authorizer" => Some(Role::Authorizer),
            "admin" => Some(Role::Admin),
            "front_office" => Some(Role::FrontOffice),
            "back_office_verifier" => Some(Role::BackOfficeVerifier),
            "back_office_final" => Some(Role::BackOfficeFinal),
            "limits_allocating_user" => Some(Role::LimitsAllocatingUser),
            "limits_allocating_authorizer" => Some(Role::LimitsAllocatingAuthorizer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Approve/reject/escalate a deal through the workflow.
    UpdateWorkflow,
    /// Run the end-of-day batch.
    RunEod,
    /// Advance or set the system business date.
    SetSystemDay,
    /// Capture counterparty limit allocations.
    AllocateLimits,
    /// Authorize counterparty limit allocations.
    ApproveLimits,
}

/// Identity and role for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Principal {
            username: username.into(),
            role,
        }
    }

    /// The single capability check: may this principal perform `action`?
    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::UpdateWorkflow => {
                matches!(self.role, Role::Authorizer | Role::Admin)
            }
            Action::RunEod | Action::SetSystemDay => matches!(self.role, Role::Admin),
            Action::AllocateLimits => matches!(
                self.role,
                Role::LimitsAllocatingUser | Role::LimitsAllocatingAuthorizer | Role::Admin
            ),
            Action::ApproveLimits => {
                matches!(self.role, Role::LimitsAllocatingAuthorizer | Role::Admin)
            }
        }
    }

    /// True for roles allowed to move deals through the approval workflow.
    pub fn is_authorizer(&self) -> bool {
        self.can(Action::UpdateWorkflow)
    }
}
