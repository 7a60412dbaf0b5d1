//! Checkout lifecycle service
//!
//! Entry point for every checkout operation. Each call receives the acting
//! user, checks it against the access policy, validates the request and hands
//! the transition to the store, which applies it atomically.

use std::sync::Arc;

use chrono::NaiveDate;
use validator::Validate;

use crate::{
    config::CheckoutsConfig,
    error::{AppError, AppResult},
    lifecycle,
    models::{
        checkout::{
            CheckoutDetails, CheckoutFilter, CheckoutQuery, CheckoutStats, CheckoutStatus,
            CreateCheckout, NewCheckout, UpdateCheckout,
        },
        Page,
    },
    policy::{Actor, Operation},
    repository::CheckoutStore,
};

#[derive(Clone)]
pub struct CheckoutsService {
    store: Arc<dyn CheckoutStore>,
    settings: CheckoutsConfig,
}

impl CheckoutsService {
    pub fn new(store: Arc<dyn CheckoutStore>, settings: CheckoutsConfig) -> Self {
        Self { store, settings }
    }

    /// Resolve list parameters: pagination bounds, and trainers pinned to their own checkouts
    pub fn filter_for(&self, actor: &Actor, query: CheckoutQuery) -> CheckoutFilter {
        let max_per_page = self.settings.max_per_page.max(1);
        let per_page = query
            .per_page
            .unwrap_or(self.settings.default_per_page)
            .clamp(1, max_per_page);

        CheckoutFilter {
            status: query.status,
            equipment_id: query.equipment_id,
            user_id: actor.borrower_scope().or(query.user_id),
            search: query.search,
            // Keeps the row offset within i64
            page: query.page.unwrap_or(1).clamp(1, i64::MAX / per_page),
            per_page,
        }
    }

    /// List checkouts visible to `actor`
    pub async fn list(&self, actor: &Actor, query: CheckoutQuery) -> AppResult<Page<CheckoutDetails>> {
        actor.require(Operation::ListCheckouts)?;
        let filter = self.filter_for(actor, query);
        let (data, total) = self.store.list(&filter).await?;
        Ok(Page::new(data, total, filter.page, filter.per_page))
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<CheckoutDetails> {
        actor.require(Operation::ShowCheckout)?;
        let checkout = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checkout {} not found", id)))?;
        actor.require_view(&checkout)?;
        Ok(checkout)
    }

    /// Lend a functional piece of equipment to a borrower
    pub async fn create(&self, actor: &Actor, request: CreateCheckout) -> AppResult<CheckoutDetails> {
        actor.require(Operation::CreateCheckout)?;
        let input = NewCheckout::try_from(request)?;
        lifecycle::check_date_order(input.checkout_date, input.expected_return_date)?;
        self.store.create(&input, actor).await
    }

    /// Apply a patch; moving to "Retourné" records the return and frees the equipment
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        patch: UpdateCheckout,
    ) -> AppResult<CheckoutDetails> {
        actor.require(Operation::UpdateCheckout)?;
        patch.validate()?;
        self.store.update(id, &patch, actor, lifecycle::today()).await
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require(Operation::DeleteCheckout)?;
        self.store.delete(id).await
    }

    /// Overdue sweep on behalf of a user
    pub async fn run_overdue_sweep(&self, actor: &Actor) -> AppResult<u64> {
        actor.require(Operation::OverdueSweep)?;
        let updated = self.sweep_overdue().await?;
        tracing::info!(actor_id = actor.id, updated, "overdue sweep requested");
        Ok(updated)
    }

    /// Overdue sweep for today, without an acting user (periodic driver)
    pub async fn sweep_overdue(&self) -> AppResult<u64> {
        self.sweep_overdue_on(lifecycle::today()).await
    }

    pub async fn sweep_overdue_on(&self, today: NaiveDate) -> AppResult<u64> {
        let updated = self.store.mark_overdue(today).await?;
        if updated > 0 {
            tracing::info!(updated, %today, "checkouts marked overdue");
        } else {
            tracing::debug!(%today, "no new overdue checkouts");
        }
        Ok(updated)
    }

    pub async fn stats(&self, actor: &Actor) -> AppResult<CheckoutStats> {
        self.stats_on(actor, lifecycle::today()).await
    }

    pub async fn stats_on(&self, actor: &Actor, today: NaiveDate) -> AppResult<CheckoutStats> {
        actor.require(Operation::CheckoutStats)?;
        let upcoming_until = lifecycle::upcoming_until(today, self.settings.upcoming_window_days);
        self.store
            .stats(actor.borrower_scope(), today, upcoming_until)
            .await
    }

    pub fn statuses(&self, actor: &Actor) -> AppResult<Vec<CheckoutStatus>> {
        actor.require(Operation::ListStatuses)?;
        Ok(CheckoutStatus::ALL.to_vec())
    }
}
