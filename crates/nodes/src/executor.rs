//! The executor that drives a compiled pipeline.
//!
//! [`PipelineExecutor::invoke`] walks the chain from the entry stage to the
//! terminal stage, threading the state through each one. After every stage
//! the returned update is checked against the monotonic-state contract before
//! it is merged. The first failure ends the run; later stages never start and
//! no partial state is returned.
//!
//! Each stage is raced against the caller's [`CancellationToken`] and, when
//! configured, an overall deadline. A stage's external call is the only
//! suspension point, and the next stage never starts before it resolves.

use std::time::Duration;

use pipeline::{
    CompiledPipeline, CompiledStage, ContractViolation, PipelineRunId, StageError,
    StageExecutionError, StateRecord,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Runs a [`CompiledPipeline`] against initial states.
///
/// The executor holds no per-run data, so one instance can serve concurrent
/// invocations.
pub struct PipelineExecutor<S: StateRecord> {
    pipeline: CompiledPipeline<S>,
    deadline: Option<Duration>,
}

impl<S: StateRecord> PipelineExecutor<S> {
    pub fn new(pipeline: CompiledPipeline<S>) -> Self {
        Self {
            pipeline,
            deadline: None,
        }
    }

    /// Bounds every invocation's total running time.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn pipeline(&self) -> &CompiledPipeline<S> {
        &self.pipeline
    }

    /// Runs every stage in order and returns the final state.
    ///
    /// # Errors
    ///
    /// Returns [`StageExecutionError`] naming the first stage that failed,
    /// broke the state contract, was cancelled, or overran the deadline.
    pub async fn invoke(
        &self,
        initial: S,
        cancel: &CancellationToken,
    ) -> Result<S, StageExecutionError> {
        let run_id = PipelineRunId::new_random();
        let span = info_span!("pipeline_run", %run_id, pipeline = %self.pipeline.name());
        self.run_chain(run_id, initial, cancel).instrument(span).await
    }

    async fn run_chain(
        &self,
        run_id: PipelineRunId,
        initial: S,
        cancel: &CancellationToken,
    ) -> Result<S, StageExecutionError> {
        let started = Instant::now();
        let deadline_at = self.deadline.map(|d| started + d);
        let mut state = initial;

        for step in self.pipeline.stages() {
            let span = info_span!("stage", stage = %step.name());
            state = self
                .run_step(step, state, deadline_at, cancel)
                .instrument(span)
                .await
                .map_err(|cause| StageExecutionError {
                    run_id,
                    stage: step.name().clone(),
                    cause,
                })?;
        }

        info!(
            stages = self.pipeline.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(state)
    }

    async fn run_step(
        &self,
        step: &CompiledStage<S>,
        state: S,
        deadline_at: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<S, StageError> {
        let started = Instant::now();
        info!(stage = %step.name(), "stage started");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageError::Cancelled),
            result = self.run_bounded(step, &state, deadline_at) => result,
        };
        let next = outcome.and_then(|update| {
            apply_update(step.stage().owned_fields(), &state, update)
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &next {
            Ok(_) => info!(stage = %step.name(), elapsed_ms, "stage finished"),
            Err(e) => info!(stage = %step.name(), elapsed_ms, error = %e, "stage failed"),
        }
        next
    }

    async fn run_bounded(
        &self,
        step: &CompiledStage<S>,
        state: &S,
        deadline_at: Option<Instant>,
    ) -> Result<S::Update, StageError> {
        let work = step.stage().run(state);
        match (deadline_at, self.deadline) {
            (Some(at), Some(deadline)) => tokio::time::timeout_at(at, work)
                .await
                .unwrap_or(Err(StageError::DeadlineExceeded { deadline })),
            _ => work.await,
        }
    }
}

/// Merges `update` into `prior`, enforcing the monotonic-state contract.
///
/// The update may only write `owned` fields, and every field populated in
/// `prior` must survive, unchanged unless owned.
pub fn apply_update<S: StateRecord>(
    owned: &[S::Field],
    prior: &S,
    update: S::Update,
) -> Result<S, StageError> {
    let violation = |field: S::Field, violation| StageError::StateContractViolation {
        field: field.to_string(),
        violation,
    };

    if let Some(field) = S::fields_written(&update)
        .into_iter()
        .find(|f| !owned.contains(f))
    {
        return Err(violation(field, ContractViolation::WroteUnownedField));
    }

    let next = prior.merge(update);
    let populated = next.populated();
    for field in prior.populated() {
        if !populated.contains(&field) {
            return Err(violation(field, ContractViolation::DroppedField));
        }
        if !owned.contains(&field) && !prior.same_value(&next, field) {
            return Err(violation(field, ContractViolation::AlteredField));
        }
    }
    Ok(next)
}
