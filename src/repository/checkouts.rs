//! Checkouts repository
//!
//! Every mutation runs in one transaction: the checkout row and the
//! equipment rows it touches are locked, the lifecycle plan is computed from
//! the locked state, and the checkout write and equipment status writes are
//! committed together.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, Row, Transaction};

use super::{apply_equipment_changes, like_pattern};
use crate::{
    error::{AppError, AppResult},
    lifecycle::{self, CheckoutWrite, Lookup},
    models::{
        checkout::{
            Checkout, CheckoutDetails, CheckoutFilter, CheckoutStats, CheckoutStatus, NewCheckout,
            UpdateCheckout,
        },
        equipment::{EquipmentShort, EquipmentStatus},
        user::UserShort,
    },
    policy::Actor,
};

/// Persistence operations the checkout lifecycle service relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Checkout with equipment and users joined
    async fn find(&self, id: i32) -> AppResult<Option<CheckoutDetails>>;

    /// One page of checkouts matching `filter`, newest checkout date first, and the total count
    async fn list(&self, filter: &CheckoutFilter) -> AppResult<(Vec<CheckoutDetails>, i64)>;

    async fn create(&self, input: &NewCheckout, actor: &Actor) -> AppResult<CheckoutDetails>;

    async fn update(
        &self,
        id: i32,
        patch: &UpdateCheckout,
        actor: &Actor,
        today: NaiveDate,
    ) -> AppResult<CheckoutDetails>;

    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Move open checkouts due before `today` to overdue; returns how many changed
    async fn mark_overdue(&self, today: NaiveDate) -> AppResult<u64>;

    async fn stats(
        &self,
        borrower: Option<i32>,
        today: NaiveDate,
        upcoming_until: NaiveDate,
    ) -> AppResult<CheckoutStats>;
}

const DETAILS_SELECT: &str = r#"
    SELECT c.*,
           e.name AS equipment_name, e.status AS equipment_status,
           u.name AS user_name, u.email AS user_email, u.role AS user_role,
           ob.name AS out_name, ob.email AS out_email, ob.role AS out_role,
           ib.name AS in_name, ib.email AS in_email, ib.role AS in_role
    FROM checkouts c
    JOIN equipment e ON e.id = c.equipment_id
    JOIN users u ON u.id = c.user_id
    JOIN users ob ON ob.id = c.checked_out_by
    LEFT JOIN users ib ON ib.id = c.checked_in_by
"#;

fn details_from_row(row: &PgRow) -> Result<CheckoutDetails, sqlx::Error> {
    let checkout = Checkout::from_row(row)?;

    let equipment = EquipmentShort {
        id: checkout.equipment_id,
        name: row.try_get("equipment_name")?,
        status: row.try_get("equipment_status")?,
    };
    let user = UserShort {
        id: checkout.user_id,
        name: row.try_get("user_name")?,
        email: row.try_get("user_email")?,
        role: row.try_get("user_role")?,
    };
    let checked_out_by = UserShort {
        id: checkout.checked_out_by,
        name: row.try_get("out_name")?,
        email: row.try_get("out_email")?,
        role: row.try_get("out_role")?,
    };
    let checked_in_by = match checkout.checked_in_by {
        Some(id) => Some(UserShort {
            id,
            name: row.try_get("in_name")?,
            email: row.try_get("in_email")?,
            role: row.try_get("in_role")?,
        }),
        None => None,
    };

    Ok(CheckoutDetails::new(
        checkout,
        equipment,
        user,
        checked_out_by,
        checked_in_by,
    ))
}

/// The partial unique index on open checkouts is the last line behind the row locks
fn conflict_on_unique(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::Conflict("Equipment already has an open checkout".to_string())
        }
        _ => AppError::Database(e),
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Checkout {} not found", id))
}

async fn lock_checkout(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<Checkout> {
    sqlx::query_as::<_, Checkout>("SELECT * FROM checkouts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Lock equipment rows in id order and return their current status
async fn lock_equipment(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i32],
) -> AppResult<Vec<(i32, EquipmentStatus)>> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let rows = sqlx::query_as::<_, (i32, EquipmentStatus)>(
        "SELECT id, status FROM equipment WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

async fn user_exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

#[derive(Clone)]
pub struct CheckoutsRepository {
    pool: Pool<Postgres>,
}

impl CheckoutsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_details(&self, id: i32) -> AppResult<CheckoutDetails> {
        self.find(id).await?.ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl CheckoutStore for CheckoutsRepository {
    async fn find(&self, id: i32) -> AppResult<Option<CheckoutDetails>> {
        let query = format!("{} WHERE c.id = $1", DETAILS_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(details_from_row).transpose()?)
    }

    async fn list(&self, filter: &CheckoutFilter) -> AppResult<(Vec<CheckoutDetails>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.status.is_some() {
            conditions.push(format!("c.status = ${}", idx));
            idx += 1;
        }
        if filter.equipment_id.is_some() {
            conditions.push(format!("c.equipment_id = ${}", idx));
            idx += 1;
        }
        if filter.user_id.is_some() {
            conditions.push(format!("c.user_id = ${}", idx));
            idx += 1;
        }

        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        if pattern.is_some() {
            conditions.push(format!(
                "(e.name ILIKE ${0} OR u.name ILIKE ${0} OR u.email ILIKE ${0} OR c.purpose ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut b = $builder;
                if let Some(status) = filter.status { b = b.bind(status); }
                if let Some(equipment_id) = filter.equipment_id { b = b.bind(equipment_id); }
                if let Some(user_id) = filter.user_id { b = b.bind(user_id); }
                if let Some(ref p) = pattern { b = b.bind(p.clone()); }
                b
            }};
        }

        let count_q = format!(
            r#"
            SELECT COUNT(*) FROM checkouts c
            JOIN equipment e ON e.id = c.equipment_id
            JOIN users u ON u.id = c.user_id
            {}
            "#,
            where_clause
        );
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "{} {} ORDER BY c.checkout_date DESC, c.id DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT,
            where_clause,
            filter.per_page,
            filter.offset()
        );
        let rows = bind_filters!(sqlx::query(&select_q))
            .fetch_all(&self.pool)
            .await?;

        let checkouts = rows
            .iter()
            .map(details_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((checkouts, total))
    }

    async fn create(&self, input: &NewCheckout, actor: &Actor) -> AppResult<CheckoutDetails> {
        let mut tx = self.pool.begin().await?;

        let equipment = lock_equipment(&mut tx, &[input.equipment_id])
            .await?
            .first()
            .map(|(_, status)| *status);
        let borrower_exists = user_exists(&mut tx, input.user_id).await?;

        let plan = lifecycle::plan_create(
            input,
            actor,
            Lookup {
                equipment,
                borrower_exists,
            },
        )?;
        let w = &plan.write;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO checkouts (
                equipment_id, user_id, checked_out_by, checked_in_by,
                checkout_date, expected_return_date, actual_return_date,
                purpose, notes, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(w.equipment_id)
        .bind(w.user_id)
        .bind(w.checked_out_by)
        .bind(w.checked_in_by)
        .bind(w.checkout_date)
        .bind(w.expected_return_date)
        .bind(w.actual_return_date)
        .bind(&w.purpose)
        .bind(&w.notes)
        .bind(w.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique)?;

        apply_equipment_changes(&mut tx, &plan.equipment).await?;
        tx.commit().await?;

        tracing::info!(
            checkout_id = id,
            equipment_id = w.equipment_id,
            borrower_id = w.user_id,
            actor_id = actor.id,
            "checkout created"
        );

        self.get_details(id).await
    }

    async fn update(
        &self,
        id: i32,
        patch: &UpdateCheckout,
        actor: &Actor,
        today: NaiveDate,
    ) -> AppResult<CheckoutDetails> {
        let mut tx = self.pool.begin().await?;

        let current = lock_checkout(&mut tx, id).await?;
        let target = patch.equipment_id.unwrap_or(current.equipment_id);
        let locked = lock_equipment(&mut tx, &[current.equipment_id, target]).await?;
        let equipment = locked
            .iter()
            .find(|(eid, _)| *eid == target)
            .map(|(_, status)| *status);

        let borrower_exists = match patch.user_id {
            Some(user_id) if user_id != current.user_id => user_exists(&mut tx, user_id).await?,
            _ => true,
        };

        let plan = lifecycle::plan_update(
            &current,
            patch,
            actor,
            today,
            Lookup {
                equipment,
                borrower_exists,
            },
        )?;

        write_checkout(&mut tx, id, &plan.write).await?;
        apply_equipment_changes(&mut tx, &plan.equipment).await?;
        tx.commit().await?;

        if current.status != plan.write.status {
            tracing::info!(
                checkout_id = id,
                from = current.status.as_str(),
                to = plan.write.status.as_str(),
                actor_id = actor.id,
                "checkout status changed"
            );
        } else {
            tracing::info!(checkout_id = id, actor_id = actor.id, "checkout updated");
        }

        self.get_details(id).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = lock_checkout(&mut tx, id).await?;
        lock_equipment(&mut tx, &[current.equipment_id]).await?;
        let changes = lifecycle::plan_delete(&current);

        sqlx::query("DELETE FROM checkouts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        apply_equipment_changes(&mut tx, &changes).await?;
        tx.commit().await?;

        tracing::info!(
            checkout_id = id,
            equipment_id = current.equipment_id,
            released = !changes.is_empty(),
            "checkout deleted"
        );
        Ok(())
    }

    async fn mark_overdue(&self, today: NaiveDate) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE checkouts SET status = $1, updated_at = NOW()
            WHERE status = $2 AND expected_return_date < $3
            "#,
        )
        .bind(CheckoutStatus::Overdue)
        .bind(CheckoutStatus::Open)
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn stats(
        &self,
        borrower: Option<i32>,
        today: NaiveDate,
        upcoming_until: NaiveDate,
    ) -> AppResult<CheckoutStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = $1) AS active,
                COUNT(*) FILTER (WHERE status = $2) AS late,
                COUNT(*) FILTER (WHERE status = $3 AND actual_return_date = $4) AS returned_today,
                COUNT(*) FILTER (
                    WHERE status = $1 AND expected_return_date BETWEEN $4 AND $5
                ) AS upcoming
            FROM checkouts
            WHERE ($6::INTEGER IS NULL OR user_id = $6)
            "#,
        )
        .bind(CheckoutStatus::Open)
        .bind(CheckoutStatus::Overdue)
        .bind(CheckoutStatus::Returned)
        .bind(today)
        .bind(upcoming_until)
        .bind(borrower)
        .fetch_one(&self.pool)
        .await?;

        Ok(CheckoutStats {
            active: row.try_get("active")?,
            late: row.try_get("late")?,
            returned_today: row.try_get("returned_today")?,
            upcoming: row.try_get("upcoming")?,
        })
    }
}

async fn write_checkout(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
    w: &CheckoutWrite,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE checkouts SET
            equipment_id = $1, user_id = $2, checked_in_by = $3,
            checkout_date = $4, expected_return_date = $5, actual_return_date = $6,
            purpose = $7, notes = $8, status = $9, updated_at = NOW()
        WHERE id = $10
        "#,
    )
    .bind(w.equipment_id)
    .bind(w.user_id)
    .bind(w.checked_in_by)
    .bind(w.checkout_date)
    .bind(w.expected_return_date)
    .bind(w.actual_return_date)
    .bind(&w.purpose)
    .bind(&w.notes)
    .bind(w.status)
    .bind(id)
    .execute(&mut **tx)
    .await
    .map_err(conflict_on_unique)?;
    Ok(())
}
