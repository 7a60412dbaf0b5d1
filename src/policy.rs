//! Role-based access policy
//!
//! Every service call receives the acting user explicitly. Staff
//! (administrators and managers) may mutate checkouts and equipment;
//! trainers may only read, and only their own checkouts.

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{checkout::CheckoutDetails, user::Role},
};

/// Operations gated by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListCheckouts,
    ShowCheckout,
    CreateCheckout,
    UpdateCheckout,
    DeleteCheckout,
    OverdueSweep,
    CheckoutStats,
    ListStatuses,
    ReadEquipment,
    WriteEquipment,
}

impl Operation {
    fn describe(&self) -> &'static str {
        match self {
            Operation::ListCheckouts => "list checkouts",
            Operation::ShowCheckout => "view checkouts",
            Operation::CreateCheckout => "create checkouts",
            Operation::UpdateCheckout => "update checkouts",
            Operation::DeleteCheckout => "delete checkouts",
            Operation::OverdueSweep => "update overdue checkouts",
            Operation::CheckoutStats => "view checkout statistics",
            Operation::ListStatuses => "list checkout statuses",
            Operation::ReadEquipment => "view equipment",
            Operation::WriteEquipment => "manage equipment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Pure role predicate. Record-level scoping for trainers is applied
/// separately by [`Actor::borrower_scope`] and [`Actor::require_view`].
pub fn authorize(role: Role, operation: Operation) -> Access {
    use Operation::*;
    match operation {
        ListCheckouts | ShowCheckout | CheckoutStats | ListStatuses | ReadEquipment => Access::Allow,
        CreateCheckout | UpdateCheckout | DeleteCheckout | OverdueSweep | WriteEquipment => {
            if role.is_staff() {
                Access::Allow
            } else {
                Access::Deny
            }
        }
    }
}

/// The authenticated user performing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i32, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Fails with `Authorization` when the role may not perform `operation`
    pub fn require(&self, operation: Operation) -> AppResult<()> {
        match authorize(self.role, operation) {
            Access::Allow => Ok(()),
            Access::Deny => {
                tracing::debug!(actor_id = self.id, role = %self.role, ?operation, "access denied");
                Err(AppError::Authorization(format!(
                    "Insufficient rights to {}",
                    operation.describe()
                )))
            }
        }
    }

    /// Borrower id that list and stats queries are pinned to, if any
    pub fn borrower_scope(&self) -> Option<i32> {
        match self.role {
            Role::Trainer => Some(self.id),
            Role::Administrator | Role::Manager => None,
        }
    }

    /// Show-level check: trainers may only view their own checkouts
    pub fn require_view(&self, checkout: &CheckoutDetails) -> AppResult<()> {
        self.require(Operation::ShowCheckout)?;
        match self.borrower_scope() {
            Some(id) if id != checkout.user_id => Err(AppError::Authorization(
                "You can only view your own checkouts".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
