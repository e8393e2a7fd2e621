//! Workflow step synchronisation

use sqlx::PgPool;
use tracing::instrument;

use domain_workflow::{WorkflowStep, WorkflowStepRegistry};

use crate::error::DatabaseError;
use crate::repositories::steps::{StepRepository, WorkflowStepRow};

fn step_to_row(step: &WorkflowStep) -> Result<WorkflowStepRow, DatabaseError> {
    Ok(WorkflowStepRow {
        step_order: i32::try_from(step.order)
            .map_err(|_| DatabaseError::invalid_data(format!("step order {} out of range", step.order)))?,
        name: step.name.clone(),
        role_name: step.role_name.as_str().to_string(),
        can_reject: step.can_reject,
        can_approve_final: step.can_approve_final,
    })
}

/// Mirrors the configured registry into `workflow_steps`
///
/// Called once at start-up, before any request is read, so the foreign key
/// from `sanction_requests.current_step` always resolves.
#[instrument(skip(pool, registry), fields(steps = registry.len()))]
pub async fn sync_registry(pool: &PgPool, registry: &WorkflowStepRegistry) -> Result<(), DatabaseError> {
    let rows = registry
        .steps()
        .iter()
        .map(step_to_row)
        .collect::<Result<Vec<_>, _>>()?;

    StepRepository::new(pool.clone()).sync(&rows).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_to_row() {
        let step = WorkflowStep::new(7, "Director Verification", "DIRECTOR")
            .with_reject()
            .with_final_approval();

        let row = step_to_row(&step).unwrap();
        assert_eq!(
            row,
            WorkflowStepRow {
                step_order: 7,
                name: "Director Verification".to_string(),
                role_name: "DIRECTOR".to_string(),
                can_reject: true,
                can_approve_final: true,
            }
        );
    }
}
