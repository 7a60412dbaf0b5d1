//! Checkout model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::equipment::EquipmentShort;
use super::user::UserShort;
use crate::error::{AppError, AppResult};

/// Lifecycle status of a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CheckoutStatus {
    #[serde(rename = "En cours")]
    Open,
    #[serde(rename = "Retourné")]
    Returned,
    #[serde(rename = "En retard")]
    Overdue,
}

impl CheckoutStatus {
    pub const ALL: [CheckoutStatus; 3] = [
        CheckoutStatus::Open,
        CheckoutStatus::Returned,
        CheckoutStatus::Overdue,
    ];

    /// Storage slug
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStatus::Open => "open",
            CheckoutStatus::Returned => "returned",
            CheckoutStatus::Overdue => "overdue",
        }
    }

    /// Label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            CheckoutStatus::Open => "En cours",
            CheckoutStatus::Returned => "Retourné",
            CheckoutStatus::Overdue => "En retard",
        }
    }

    /// Whether the borrowed equipment is still out
    pub fn holds_equipment(&self) -> bool {
        !matches!(self, CheckoutStatus::Returned)
    }

    /// Legal status moves. Staying in place is always allowed; nothing leaves `Returned`.
    pub fn can_transition_to(&self, next: CheckoutStatus) -> bool {
        use CheckoutStatus::*;
        match (self, next) {
            (Open, Open) | (Overdue, Overdue) | (Returned, Returned) => true,
            (Open, Returned) | (Open, Overdue) | (Overdue, Returned) => true,
            (Returned, _) | (Overdue, Open) => false,
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for CheckoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckoutStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s || st.label() == s)
            .ok_or_else(|| format!("Invalid checkout status: {}", s))
    }
}

text_enum_sqlx!(CheckoutStatus);

/// Checkout row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Checkout {
    pub id: i32,
    pub equipment_id: i32,
    /// Borrower
    pub user_id: i32,
    /// Staff member who lent the equipment
    pub checked_out_by: i32,
    /// Staff member who recorded the return
    pub checked_in_by: Option<i32>,
    pub checkout_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub purpose: String,
    pub notes: Option<String>,
    pub status: CheckoutStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkout with its equipment and users joined, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutDetails {
    pub id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    pub checkout_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub purpose: String,
    pub notes: Option<String>,
    pub status: CheckoutStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub equipment: EquipmentShort,
    pub user: UserShort,
    pub checked_out_by: UserShort,
    pub checked_in_by: Option<UserShort>,
}

impl CheckoutDetails {
    pub fn new(
        checkout: Checkout,
        equipment: EquipmentShort,
        user: UserShort,
        checked_out_by: UserShort,
        checked_in_by: Option<UserShort>,
    ) -> Self {
        Self {
            id: checkout.id,
            equipment_id: checkout.equipment_id,
            user_id: checkout.user_id,
            checkout_date: checkout.checkout_date,
            expected_return_date: checkout.expected_return_date,
            actual_return_date: checkout.actual_return_date,
            purpose: checkout.purpose,
            notes: checkout.notes,
            status: checkout.status,
            created_at: checkout.created_at,
            updated_at: checkout.updated_at,
            equipment,
            user,
            checked_out_by,
            checked_in_by,
        }
    }
}

/// Create checkout request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateCheckout {
    #[validate(required(message = "The equipment id field is required."))]
    pub equipment_id: Option<i32>,
    /// Borrower
    #[validate(required(message = "The user id field is required."))]
    pub user_id: Option<i32>,
    #[validate(required(message = "The checkout date field is required."))]
    pub checkout_date: Option<NaiveDate>,
    /// Must be strictly after `checkout_date`
    #[validate(required(message = "The expected return date field is required."))]
    pub expected_return_date: Option<NaiveDate>,
    #[validate(
        required(message = "The purpose field is required."),
        length(min = 1, max = 1000, message = "The purpose field is required.")
    )]
    pub purpose: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

/// Validated input for a new checkout
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckout {
    pub equipment_id: i32,
    pub user_id: i32,
    pub checkout_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub purpose: String,
    pub notes: Option<String>,
}

impl TryFrom<CreateCheckout> for NewCheckout {
    type Error = AppError;

    fn try_from(req: CreateCheckout) -> AppResult<Self> {
        req.validate()?;
        match req {
            CreateCheckout {
                equipment_id: Some(equipment_id),
                user_id: Some(user_id),
                checkout_date: Some(checkout_date),
                expected_return_date: Some(expected_return_date),
                purpose: Some(purpose),
                notes,
            } => Ok(NewCheckout {
                equipment_id,
                user_id,
                checkout_date,
                expected_return_date,
                purpose,
                notes,
            }),
            _ => Err(AppError::BadRequest("Missing required checkout fields".to_string())),
        }
    }
}

/// Partial checkout update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
pub struct UpdateCheckout {
    pub equipment_id: Option<i32>,
    pub user_id: Option<i32>,
    pub checkout_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    /// Defaults to today when the checkout is being returned
    pub actual_return_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 1000, message = "The purpose field cannot be empty."))]
    pub purpose: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub status: Option<CheckoutStatus>,
}

/// Checkout list query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct CheckoutQuery {
    pub status: Option<CheckoutStatus>,
    pub equipment_id: Option<i32>,
    /// Borrower filter (staff only; trainers always see their own checkouts)
    pub user_id: Option<i32>,
    /// Matches equipment name, borrower name or email, and purpose
    pub search: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Resolved list filter handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutFilter {
    pub status: Option<CheckoutStatus>,
    pub equipment_id: Option<i32>,
    pub user_id: Option<i32>,
    pub search: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

impl CheckoutFilter {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStats {
    /// Open checkouts
    pub active: i64,
    /// Overdue checkouts
    pub late: i64,
    /// Checkouts returned today
    pub returned_today: i64,
    /// Open checkouts due back within the upcoming window
    pub upcoming: i64,
}
