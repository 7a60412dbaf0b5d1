//! Equipment repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::like_pattern;
use crate::{
    error::{AppError, AppResult},
    lifecycle,
    models::{
        checkout::CheckoutStatus,
        equipment::{CreateEquipment, Equipment, EquipmentQuery, EquipmentStatus, UpdateEquipment},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>>;
    async fn get(&self, id: i32) -> AppResult<Equipment>;
    async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment>;
    async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Equipment {} not found", id))
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentStore for EquipmentRepository {
    /// List equipment, optionally filtered by status or a name/serial search
    async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE ($1::VARCHAR IS NULL OR status = $1)
              AND ($2::VARCHAR IS NULL OR name ILIKE $2 OR serial_number ILIKE $2)
            ORDER BY name
            "#,
        )
        .bind(query.status)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        lifecycle::check_equipment_status_write(None, data.status)?;

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, description, serial_number, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.serial_number)
        .bind(data.status.unwrap_or(EquipmentStatus::Functional))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(equipment_id = row.id, "equipment created");
        Ok(row)
    }

    async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current: EquipmentStatus =
            sqlx::query_scalar("SELECT status FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found(id))?;
        lifecycle::check_equipment_status_write(Some(current), data.status)?;

        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.description, "description");
        add_field!(data.serial_number, "serial_number");
        add_field!(data.status, "status");

        let query = format!(
            "UPDATE equipment SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.description);
        bind_field!(data.serial_number);
        bind_field!(data.status);

        let row = builder.bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;

        if let Some(status) = data.status.filter(|s| *s != current) {
            tracing::info!(
                equipment_id = id,
                from = current.as_str(),
                to = status.as_str(),
                "equipment status changed"
            );
        }
        Ok(row)
    }

    /// Delete equipment and its returned checkout history
    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(id))?;

        let has_open_checkout: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM checkouts WHERE equipment_id = $1 AND status <> $2)",
        )
        .bind(id)
        .bind(CheckoutStatus::Returned)
        .fetch_one(&mut *tx)
        .await?;
        lifecycle::check_equipment_deletable(has_open_checkout)?;

        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(equipment_id = id, "equipment deleted");
        Ok(())
    }
}
