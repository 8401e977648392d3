//! The approval state machine, as pure decision logic.
//!
//! The lifecycle manager loads the deal, asks this module what the
//! transition means, and persists the outcome. The rules themselves never
//! touch the database.

use crate::domain::{ApprovalLevel, ApprovalStep, DealStatus, Principal, Role};
use crate::error::AppError;

/// Current workflow position of the deal being updated.
#[derive(Debug, Clone)]
pub struct WorkflowContext<'a> {
    pub principal: &'a Principal,
    pub status: DealStatus,
    pub current_level: ApprovalLevel,
    pub submitted_by: &'a str,
}

/// A workflow-only update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRequest {
    /// Approve or reject at the deal's current level.
    Decision {
        status: DealStatus,
        comment: Option<String>,
    },
    /// Authorizer escalation touching only the workflow position fields.
    Escalation {
        approval_status: Option<DealStatus>,
        current_approval_level: Option<ApprovalLevel>,
    },
}

/// The fields to persist after a workflow transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub status: DealStatus,
    pub approval_status: DealStatus,
    pub current_approval_level: ApprovalLevel,
    pub step: Option<ApprovalStep>,
    pub comment: Option<String>,
}

/// Decide a workflow transition.
///
/// Only authorizer/admin principals may move the workflow. Rejection
/// requires a comment. A rejection decided while the deal sits at a
/// back-office level sends it back to the start (pending at front office)
/// regardless of who created it; a front-office rejection marks the deal
/// rejected, after which only its creator may edit it.
pub fn decide_workflow(
    ctx: &WorkflowContext<'_>,
    request: &WorkflowRequest,
) -> Result<WorkflowOutcome, AppError> {
    if !ctx.principal.is_authorizer() {
        return Err(AppError::Permission(format!(
            "only authorizers can update deal status (role: {})",
            ctx.principal.role
        )));
    }

    match request {
        WorkflowRequest::Decision { status, comment } => match status {
            DealStatus::Rejected => {
                let comment = comment
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "comment is required when rejecting a deal".to_string(),
                        )
                    })?
                    .to_string();

                let step = ApprovalStep {
                    level: ctx.current_level,
                    decision: DealStatus::Rejected,
                    by: ctx.principal.username.clone(),
                    comment: Some(comment.clone()),
                };

                if ctx.current_level.is_back_office() {
                    // Send back to the start of the ladder.
                    Ok(WorkflowOutcome {
                        status: DealStatus::Pending,
                        approval_status: DealStatus::Pending,
                        current_approval_level: ApprovalLevel::FrontOffice,
                        step: Some(step),
                        comment: Some(comment),
                    })
                } else {
                    Ok(WorkflowOutcome {
                        status: DealStatus::Rejected,
                        approval_status: DealStatus::Rejected,
                        current_approval_level: ctx.current_level,
                        step: Some(step),
                        comment: Some(comment),
                    })
                }
            }
            DealStatus::Approved => {
                let step = ApprovalStep {
                    level: ctx.current_level,
                    decision: DealStatus::Approved,
                    by: ctx.principal.username.clone(),
                    comment: comment.clone(),
                };
                match ctx.current_level.next() {
                    Some(next_level) => Ok(WorkflowOutcome {
                        status: DealStatus::Pending,
                        approval_status: DealStatus::Approved,
                        current_approval_level: next_level,
                        step: Some(step),
                        comment: comment.clone(),
                    }),
                    None => Ok(WorkflowOutcome {
                        status: DealStatus::Approved,
                        approval_status: DealStatus::Approved,
                        current_approval_level: ctx.current_level,
                        step: Some(step),
                        comment: comment.clone(),
                    }),
                }
            }
            DealStatus::Pending => Ok(WorkflowOutcome {
                status: DealStatus::Pending,
                approval_status: DealStatus::Pending,
                current_approval_level: ctx.current_level,
                step: None,
                comment: comment.clone(),
            }),
        },
        WorkflowRequest::Escalation {
            approval_status,
            current_approval_level,
        } => Ok(WorkflowOutcome {
            status: ctx.status,
            approval_status: approval_status.unwrap_or(ctx.status),
            current_approval_level: current_approval_level.unwrap_or(ctx.current_level),
            step: None,
            comment: None,
        }),
    }
}

/// What a business-field edit does to the deal's workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEffect {
    /// Non-admin edits re-submit the deal for review.
    pub reset_to_pending: bool,
}

/// Validate that `principal` may edit the deal's business fields.
///
/// Pure authorizers may only move the workflow, never edit fields. A
/// rejected deal is editable only by its creator.
pub fn validate_field_edit(
    principal: &Principal,
    deal_status: DealStatus,
    submitted_by: &str,
) -> Result<EditEffect, AppError> {
    if principal.role == Role::Authorizer {
        return Err(AppError::Permission(
            "authorizers can only update deal status".to_string(),
        ));
    }

    if deal_status == DealStatus::Rejected && principal.username != submitted_by {
        return Err(AppError::Permission(
            "only the creator can edit a rejected deal".to_string(),
        ));
    }

    Ok(EditEffect {
        reset_to_pending: principal.role != Role::Admin,
    })
}
