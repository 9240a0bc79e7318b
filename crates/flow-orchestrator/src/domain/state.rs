//! The workflow aggregate: ordered steps plus a forward-only cursor.

use super::step::{StepId, StepStatus, StepUpdate, WorkflowStep};
use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};

/// Ordered steps of one run.
///
/// Created fresh per run from a list of titles; the step set never changes
/// afterwards. `current_step` is 0 before any step starts and otherwise the
/// 1-based position of the step being executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    steps: Vec<WorkflowStep>,
    current_step: usize,
    total_steps: usize,
    /// Display toggle, orthogonal to progress
    pub show_details: bool,
}

impl WorkflowState {
    /// Build a state with ids `1..=n` in declaration order.
    pub fn from_titles<I, S>(titles: I) -> WorkflowResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps: Vec<WorkflowStep> = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| WorkflowStep::new(i as StepId + 1, title))
            .collect();

        if steps.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }

        Ok(Self {
            total_steps: steps.len(),
            steps,
            current_step: 0,
            show_details: false,
        })
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    fn position(&self, id: StepId) -> WorkflowResult<usize> {
        self.steps
            .iter()
            .position(|s| s.id() == id)
            .map(|idx| idx + 1)
            .ok_or(WorkflowError::StepNotFound { step_id: id })
    }

    /// Move the cursor to the position of `id`.
    ///
    /// Re-entering the current position is allowed; moving back is not.
    pub fn advance(&mut self, id: StepId) -> WorkflowResult<usize> {
        let position = self.position(id)?;
        if position < self.current_step {
            return Err(WorkflowError::InvalidAdvance {
                from: self.current_step,
                to: position,
            });
        }
        self.current_step = position;
        Ok(position)
    }

    /// Merge `update` into the step named by `id`.
    pub fn update(&mut self, id: StepId, update: StepUpdate) -> WorkflowResult<&WorkflowStep> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(WorkflowError::StepNotFound { step_id: id })?;
        step.apply(update)?;
        Ok(step)
    }

    pub fn toggle_details(&mut self) -> bool {
        self.show_details = !self.show_details;
        self.show_details
    }

    pub fn all_completed(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.status() == StepStatus::Completed)
    }

    pub fn first_failed(&self) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.status() == StepStatus::Failed)
    }

    pub fn count_with(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status() == status).count()
    }
}
