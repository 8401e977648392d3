//! Deal lifecycle orchestration: creation, workflow, deletion, numbering,
//! and the end-of-day batch.

pub mod eod;
pub mod manager;
pub mod numbering;
pub mod workflow;

pub use eod::{EodResult, EodRunner};
pub use manager::{
    DealService, GsecStatusPatch, NewGsecDeal, NewMoneyMarketDeal, NewTransaction,
    TransactionPatch,
};
pub use workflow::{
    decide_workflow, validate_field_edit, EditEffect, WorkflowContext, WorkflowOutcome,
    WorkflowRequest,
};
