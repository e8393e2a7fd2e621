//! Workflow step table
//!
//! The step list is configured in a file and loaded once at start-up; this
//! table mirrors it so persisted requests can reference step orders.

use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::error::DatabaseError;

/// Database row for a workflow step
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WorkflowStepRow {
    pub step_order: i32,
    pub name: String,
    pub role_name: String,
    pub can_reject: bool,
    pub can_approve_final: bool,
}

#[derive(Debug, Clone)]
pub struct StepRepository {
    pool: PgPool,
}

impl StepRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Makes the table match `steps` in one transaction
    ///
    /// Steps no longer configured are removed unless a request still sits
    /// at them.
    pub async fn sync(&self, steps: &[WorkflowStepRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for step in steps {
            sqlx::query(
                r#"
                INSERT INTO workflow_steps (step_order, name, role_name, can_reject, can_approve_final)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (step_order) DO UPDATE
                SET name = EXCLUDED.name,
                    role_name = EXCLUDED.role_name,
                    can_reject = EXCLUDED.can_reject,
                    can_approve_final = EXCLUDED.can_approve_final
                "#,
            )
            .bind(step.step_order)
            .bind(&step.name)
            .bind(&step.role_name)
            .bind(step.can_reject)
            .bind(step.can_approve_final)
            .execute(&mut *tx)
            .await?;
        }

        let orders: Vec<i32> = steps.iter().map(|s| s.step_order).collect();
        let removed = sqlx::query(
            r#"
            DELETE FROM workflow_steps ws
            WHERE ws.step_order <> ALL($1)
              AND NOT EXISTS (
                  SELECT 1 FROM sanction_requests sr WHERE sr.current_step = ws.step_order
              )
            "#,
        )
        .bind(&orders)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        info!(steps = steps.len(), removed, "Workflow steps synchronised");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<WorkflowStepRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, WorkflowStepRow>(
            r#"
            SELECT step_order, name, role_name, can_reject, can_approve_final
            FROM workflow_steps
            ORDER BY step_order ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
