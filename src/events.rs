use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::AccountId;
use crate::decimal::Money;
use crate::ledger::PostingPlan;
use crate::schedule::ScheduledEvent;

/// notification amounts render at cash precision
const FULFILMENT_DP: u32 = 2;

/// fire-and-forget workflow/notification requests to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowRequest {
    LoanClosure {
        account_id: AccountId,
    },
    LoanMarkDelinquent {
        account_id: AccountId,
    },
    LoanRepaymentNotification {
        account_id: AccountId,
        repayment_amount: Money,
        overdue_date: NaiveDate,
    },
    LoanOverdueRepaymentNotification {
        account_id: AccountId,
        repayment_amount: Money,
        overdue_date: NaiveDate,
        late_repayment_fee: Money,
    },
}

impl WorkflowRequest {
    /// workflow name as declared to the host
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowRequest::LoanClosure { .. } => "LOAN_CLOSURE",
            WorkflowRequest::LoanMarkDelinquent { .. } => "LOAN_MARK_DELINQUENT",
            WorkflowRequest::LoanRepaymentNotification { .. } => "LOAN_REPAYMENT_NOTIFICATION",
            WorkflowRequest::LoanOverdueRepaymentNotification { .. } => {
                "LOAN_OVERDUE_REPAYMENT_NOTIFICATION"
            }
        }
    }

    /// context dict handed to the workflow instantiation API
    pub fn context(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut context = serde_json::Map::new();
        match self {
            WorkflowRequest::LoanClosure { account_id }
            | WorkflowRequest::LoanMarkDelinquent { account_id } => {
                context.insert("account_id".into(), account_id.to_string().into());
            }
            WorkflowRequest::LoanRepaymentNotification {
                account_id,
                repayment_amount,
                overdue_date,
            } => {
                context.insert("account_id".into(), account_id.to_string().into());
                context.insert(
                    "repayment_amount".into(),
                    repayment_amount.to_string_dp(FULFILMENT_DP).into(),
                );
                context.insert("overdue_date".into(), overdue_date.to_string().into());
            }
            WorkflowRequest::LoanOverdueRepaymentNotification {
                account_id,
                repayment_amount,
                overdue_date,
                late_repayment_fee,
            } => {
                context.insert("account_id".into(), account_id.to_string().into());
                context.insert(
                    "repayment_amount".into(),
                    repayment_amount.to_string_dp(FULFILMENT_DP).into(),
                );
                context.insert("overdue_date".into(), overdue_date.to_string().into());
                context.insert(
                    "late_repayment_fee".into(),
                    late_repayment_fee.to_string_dp(FULFILMENT_DP).into(),
                );
            }
        }
        context
    }
}

/// Everything one hook invocation hands back to the host: a posting batch
/// committed atomically, workflow requests, and schedule re-declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutput {
    pub postings: PostingPlan,
    pub workflows: Vec<WorkflowRequest>,
    pub schedule_updates: Vec<ScheduledEvent>,
}

impl HookOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.postings.is_empty() && self.workflows.is_empty() && self.schedule_updates.is_empty()
    }
}
