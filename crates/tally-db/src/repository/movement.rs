//! # Cash Movement Repository
//!
//! Append-only storage for manual drawer movements (expenses and income).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::CashMovement;

/// Repository for cash movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Inserts a movement. Movements are never updated.
    pub async fn insert(&self, movement: &CashMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            shift_id = %movement.shift_id,
            kind = %movement.kind,
            amount_cents = movement.amount_cents,
            "Inserting cash movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, shift_id, kind, concept, amount_cents, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.shift_id)
        .bind(movement.kind)
        .bind(&movement.concept)
        .bind(movement.amount_cents)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All movements of a shift, oldest first.
    pub async fn list_for_shift(&self, shift_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements: Vec<CashMovement> = sqlx::query_as(
            r#"
            SELECT id, shift_id, kind, concept, amount_cents, user_id, created_at
            FROM cash_movements
            WHERE shift_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{at, folio, memory_db};
    use crate::DbError;
    use tally_core::{CashShift, FolioKind, Money, MovementKind};

    fn movement(id: &str, shift_id: &str, kind: MovementKind, cents: i64) -> CashMovement {
        CashMovement {
            id: id.to_string(),
            shift_id: shift_id.to_string(),
            kind,
            concept: "Courier".to_string(),
            amount_cents: cents,
            user_id: "cashier".to_string(),
            created_at: at(11, 0),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = memory_db().await;
        let shift = CashShift::open(
            "shift-1".to_string(),
            folio(FolioKind::Close, 1),
            1,
            1,
            "cashier".to_string(),
            Money::zero(),
            at(8, 0),
        );
        db.shifts().insert(&shift).await.unwrap();

        db.movements()
            .insert(&movement("m1", "shift-1", MovementKind::Expense, 3000))
            .await
            .unwrap();
        db.movements()
            .insert(&movement("m2", "shift-1", MovementKind::Income, 5000))
            .await
            .unwrap();

        let listed = db.movements().list_for_shift("shift-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, MovementKind::Expense);
        assert_eq!(listed[1].kind, MovementKind::Income);
        assert!(db.movements().list_for_shift("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movement_needs_shift() {
        let db = memory_db().await;
        let err = db
            .movements()
            .insert(&movement("m1", "nope", MovementKind::Expense, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
