//! Checkout / equipment state machine
//!
//! Planning functions are pure: given the records the store has locked, they
//! validate a requested change and return the checkout values to write plus
//! the equipment status changes that must commit in the same transaction.
//! Equipment status is only ever written from a [`Plan`] or through
//! [`check_equipment_status_write`].

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{
        checkout::{Checkout, CheckoutStatus, NewCheckout, UpdateCheckout},
        equipment::EquipmentStatus,
    },
    policy::Actor,
};

/// Current date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Equipment status write produced by a checkout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentChange {
    pub equipment_id: i32,
    pub status: EquipmentStatus,
}

impl EquipmentChange {
    fn reserve(equipment_id: i32) -> Self {
        Self {
            equipment_id,
            status: EquipmentStatus::Reserved,
        }
    }

    fn release(equipment_id: i32) -> Self {
        Self {
            equipment_id,
            status: EquipmentStatus::Functional,
        }
    }
}

/// Fully resolved checkout values
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutWrite {
    pub equipment_id: i32,
    pub user_id: i32,
    pub checked_out_by: i32,
    pub checked_in_by: Option<i32>,
    pub checkout_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub purpose: String,
    pub notes: Option<String>,
    pub status: CheckoutStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub write: CheckoutWrite,
    pub equipment: Vec<EquipmentChange>,
}

/// Facts looked up by the store (under lock) before planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Status of the equipment the checkout will point to; `None` if no such row
    pub equipment: Option<EquipmentStatus>,
    /// Whether the borrower named by the request exists
    pub borrower_exists: bool,
}

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn check_dates(errors: &mut FieldErrors, checkout_date: NaiveDate, expected_return_date: NaiveDate) {
    if expected_return_date <= checkout_date {
        push_error(
            errors,
            "expected_return_date",
            "The expected return date must be a date after checkout date.",
        );
    }
}

fn finish(errors: FieldErrors) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

fn unavailable(status: EquipmentStatus) -> AppError {
    AppError::Conflict(format!(
        "Equipment is not available for checkout (status: {})",
        status
    ))
}

/// Expected return date must be strictly after the checkout date
pub fn check_date_order(checkout_date: NaiveDate, expected_return_date: NaiveDate) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    check_dates(&mut errors, checkout_date, expected_return_date);
    finish(errors)
}

/// Plan a new checkout: opens it and reserves the equipment.
pub fn plan_create(input: &NewCheckout, actor: &Actor, lookup: Lookup) -> AppResult<Plan> {
    let mut errors = FieldErrors::new();
    check_dates(&mut errors, input.checkout_date, input.expected_return_date);
    if lookup.equipment.is_none() {
        push_error(&mut errors, "equipment_id", "The selected equipment id is invalid.");
    }
    if !lookup.borrower_exists {
        push_error(&mut errors, "user_id", "The selected user id is invalid.");
    }
    finish(errors)?;

    if let Some(status) = lookup.equipment.filter(|s| !s.is_available()) {
        return Err(unavailable(status));
    }

    Ok(Plan {
        write: CheckoutWrite {
            equipment_id: input.equipment_id,
            user_id: input.user_id,
            checked_out_by: actor.id,
            checked_in_by: None,
            checkout_date: input.checkout_date,
            expected_return_date: input.expected_return_date,
            actual_return_date: None,
            purpose: input.purpose.clone(),
            notes: input.notes.clone(),
            status: CheckoutStatus::Open,
        },
        equipment: vec![EquipmentChange::reserve(input.equipment_id)],
    })
}

/// Plan a patch on an existing checkout.
///
/// `lookup.equipment` is only consulted when the patch moves the checkout to
/// another piece of equipment; `lookup.borrower_exists` only when it changes
/// the borrower.
pub fn plan_update(
    current: &Checkout,
    patch: &UpdateCheckout,
    actor: &Actor,
    today: NaiveDate,
    lookup: Lookup,
) -> AppResult<Plan> {
    use CheckoutStatus::*;

    let next = patch.status.unwrap_or(current.status);
    if !current.status.can_transition_to(next) {
        return Err(AppError::BusinessRule(format!(
            "Cannot change checkout status from \"{}\" to \"{}\"",
            current.status, next
        )));
    }

    let mut errors = FieldErrors::new();

    let checkout_date = patch.checkout_date.unwrap_or(current.checkout_date);
    let expected_return_date = patch
        .expected_return_date
        .unwrap_or(current.expected_return_date);
    check_dates(&mut errors, checkout_date, expected_return_date);

    if next == Overdue && expected_return_date >= today {
        if current.status == Overdue {
            push_error(
                &mut errors,
                "expected_return_date",
                "The expected return date of an overdue checkout must be in the past.",
            );
        } else {
            push_error(
                &mut errors,
                "status",
                "A checkout can only be marked overdue once its expected return date has passed.",
            );
        }
    }

    let (actual_return_date, checked_in_by) = match (current.status, next) {
        (Returned, Returned) => (
            patch.actual_return_date.or(current.actual_return_date),
            current.checked_in_by,
        ),
        (_, Returned) => (Some(patch.actual_return_date.unwrap_or(today)), Some(actor.id)),
        _ => {
            if patch.actual_return_date.is_some() {
                push_error(
                    &mut errors,
                    "actual_return_date",
                    "The actual return date can only be set when the checkout is returned.",
                );
            }
            (None, None)
        }
    };
    if let Some(returned_on) = patch.actual_return_date {
        if returned_on < checkout_date {
            push_error(
                &mut errors,
                "actual_return_date",
                "The actual return date must be a date after or equal to checkout date.",
            );
        }
    }

    let user_id = patch.user_id.unwrap_or(current.user_id);
    if user_id != current.user_id && !lookup.borrower_exists {
        push_error(&mut errors, "user_id", "The selected user id is invalid.");
    }

    let equipment_id = patch.equipment_id.unwrap_or(current.equipment_id);
    let reassigning = equipment_id != current.equipment_id;
    if reassigning && lookup.equipment.is_none() {
        push_error(&mut errors, "equipment_id", "The selected equipment id is invalid.");
    }

    finish(errors)?;

    let mut equipment = Vec::new();
    if current.status.holds_equipment() {
        if next.holds_equipment() {
            if reassigning {
                if let Some(status) = lookup.equipment.filter(|s| !s.is_available()) {
                    return Err(unavailable(status));
                }
                equipment.push(EquipmentChange::release(current.equipment_id));
                equipment.push(EquipmentChange::reserve(equipment_id));
            }
        } else {
            // The item that was out is the one coming back.
            equipment.push(EquipmentChange::release(current.equipment_id));
        }
    }

    Ok(Plan {
        write: CheckoutWrite {
            equipment_id,
            user_id,
            checked_out_by: current.checked_out_by,
            checked_in_by,
            checkout_date,
            expected_return_date,
            actual_return_date,
            purpose: patch.purpose.clone().unwrap_or_else(|| current.purpose.clone()),
            notes: patch.notes.clone().or_else(|| current.notes.clone()),
            status: next,
        },
        equipment,
    })
}

/// Equipment writes required when deleting `current`
pub fn plan_delete(current: &Checkout) -> Vec<EquipmentChange> {
    if current.status.holds_equipment() {
        vec![EquipmentChange::release(current.equipment_id)]
    } else {
        Vec::new()
    }
}

/// Open checkouts whose expected return date is before `today` are overdue
pub fn is_overdue(checkout: &Checkout, today: NaiveDate) -> bool {
    checkout.status == CheckoutStatus::Open && checkout.expected_return_date < today
}

/// Last day (inclusive) of the "upcoming returns" window
pub fn upcoming_until(today: NaiveDate, window_days: i64) -> NaiveDate {
    today
        .checked_add_signed(Duration::days(window_days))
        .unwrap_or(NaiveDate::MAX)
}

/// Guards status writes made from the equipment endpoints. `current` is
/// `None` when the equipment is being created.
pub fn check_equipment_status_write(
    current: Option<EquipmentStatus>,
    requested: Option<EquipmentStatus>,
) -> AppResult<()> {
    match (current, requested) {
        (_, Some(EquipmentStatus::Reserved)) => Err(AppError::field(
            "status",
            "The reserved status is managed by checkouts.",
        )),
        (Some(EquipmentStatus::Reserved), Some(_)) => Err(AppError::Conflict(
            "Equipment is checked out; its status changes when the checkout is returned".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Equipment with an unreturned checkout cannot be deleted
pub fn check_equipment_deletable(has_open_checkout: bool) -> AppResult<()> {
    if has_open_checkout {
        Err(AppError::Conflict(
            "Equipment is checked out and cannot be deleted".to_string(),
        ))
    } else {
        Ok(())
    }
}
