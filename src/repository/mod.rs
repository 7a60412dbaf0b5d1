//! Repository layer for database operations

pub mod checkouts;
pub mod equipment;

use sqlx::{Pool, Postgres, Transaction};

use crate::{error::AppResult, lifecycle::EquipmentChange};

pub use checkouts::{CheckoutStore, CheckoutsRepository};
pub use equipment::{EquipmentRepository, EquipmentStore};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub checkouts: CheckoutsRepository,
    pub equipment: EquipmentRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            checkouts: CheckoutsRepository::new(pool.clone()),
            equipment: EquipmentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round trip to the database, used by the readiness check
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Apply equipment status changes planned by the lifecycle inside `tx`
pub(crate) async fn apply_equipment_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: &[EquipmentChange],
) -> AppResult<()> {
    for change in changes {
        sqlx::query("UPDATE equipment SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(change.status)
            .bind(change.equipment_id)
            .execute(&mut **tx)
            .await?;
        tracing::debug!(
            equipment_id = change.equipment_id,
            status = change.status.as_str(),
            "equipment status updated"
        );
    }
    Ok(())
}

/// Escape LIKE metacharacters and wrap the term for a substring match
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
