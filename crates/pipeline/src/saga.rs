//! Minimal saga: ordered {action, compensation} pairs.
//!
//! The dual-sink commit is expressed as a list of steps so adding a sink
//! never requires re-deriving the rollback order: on the first failing step,
//! every previously applied step is compensated in reverse.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::PipelineError;

#[async_trait]
pub trait SagaStep: Send + Sync {
    fn name(&self) -> &'static str;
    async fn apply(&self) -> Result<(), PipelineError>;
    async fn compensate(&self) -> Result<(), PipelineError>;
}

pub struct SagaFailure {
    pub failed_step: &'static str,
    pub error: PipelineError,
    /// Steps whose compensation itself failed, oldest first.
    pub failed_compensations: Vec<(&'static str, PipelineError)>,
}

pub async fn run(steps: &[Box<dyn SagaStep>]) -> Result<(), SagaFailure> {
    let mut applied: Vec<&dyn SagaStep> = Vec::new();
    for step in steps {
        match step.apply().await {
            Ok(()) => applied.push(step.as_ref()),
            Err(err) => {
                error!("saga step '{}' failed: {}; compensating", step.name(), err);
                let mut failed_compensations = Vec::new();
                for done in applied.into_iter().rev() {
                    match done.compensate().await {
                        Ok(()) => info!("compensated step '{}'", done.name()),
                        Err(comp_err) => {
                            error!("compensation of '{}' failed: {}", done.name(), comp_err);
                            failed_compensations.push((done.name(), comp_err));
                        }
                    }
                }
                failed_compensations.reverse();
                return Err(SagaFailure {
                    failed_step: step.name(),
                    error: err,
                    failed_compensations,
                });
            }
        }
    }
    Ok(())
}
