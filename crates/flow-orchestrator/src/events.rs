//! # Workflow Events
//!
//! Published after every mutation of a run. Each event carries the full
//! snapshot taken right after the mutation, so an observer never has to
//! read back from the runner to render.

use crate::domain::{StepId, StepStatus, WorkflowSnapshot};
use shared_bus::BusEvent;
use std::sync::Arc;
use uuid::Uuid;

/// Bus topics for workflow events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowTopic {
    /// Run initialized, finished or reset
    Lifecycle,
    /// Step updates and cursor moves
    Steps,
    /// Messages and errors
    Log,
}

/// Events emitted by the workflow runner.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    RunInitialized {
        run_id: Uuid,
        snapshot: Arc<WorkflowSnapshot>,
    },
    StepUpdated {
        run_id: Uuid,
        step_id: StepId,
        status: StepStatus,
        snapshot: Arc<WorkflowSnapshot>,
    },
    CursorAdvanced {
        run_id: Uuid,
        position: usize,
        snapshot: Arc<WorkflowSnapshot>,
    },
    Message {
        run_id: Uuid,
        text: String,
        snapshot: Arc<WorkflowSnapshot>,
    },
    RunFinished {
        run_id: Uuid,
        success: bool,
        snapshot: Arc<WorkflowSnapshot>,
    },
    /// The run was discarded; the snapshot is its last state
    RunReset {
        run_id: Uuid,
        snapshot: Arc<WorkflowSnapshot>,
    },
}

impl WorkflowEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            WorkflowEvent::RunInitialized { run_id, .. }
            | WorkflowEvent::StepUpdated { run_id, .. }
            | WorkflowEvent::CursorAdvanced { run_id, .. }
            | WorkflowEvent::Message { run_id, .. }
            | WorkflowEvent::RunFinished { run_id, .. }
            | WorkflowEvent::RunReset { run_id, .. } => *run_id,
        }
    }

    pub fn snapshot(&self) -> &WorkflowSnapshot {
        match self {
            WorkflowEvent::RunInitialized { snapshot, .. }
            | WorkflowEvent::StepUpdated { snapshot, .. }
            | WorkflowEvent::CursorAdvanced { snapshot, .. }
            | WorkflowEvent::Message { snapshot, .. }
            | WorkflowEvent::RunFinished { snapshot, .. }
            | WorkflowEvent::RunReset { snapshot, .. } => snapshot,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::RunInitialized { .. } => "run_initialized",
            WorkflowEvent::StepUpdated { .. } => "step_updated",
            WorkflowEvent::CursorAdvanced { .. } => "cursor_advanced",
            WorkflowEvent::Message { .. } => "message",
            WorkflowEvent::RunFinished { .. } => "run_finished",
            WorkflowEvent::RunReset { .. } => "run_reset",
        }
    }
}

impl BusEvent for WorkflowEvent {
    type Topic = WorkflowTopic;

    fn topic(&self) -> WorkflowTopic {
        match self {
            WorkflowEvent::RunInitialized { .. }
            | WorkflowEvent::RunFinished { .. }
            | WorkflowEvent::RunReset { .. } => WorkflowTopic::Lifecycle,
            WorkflowEvent::StepUpdated { .. } | WorkflowEvent::CursorAdvanced { .. } => {
                WorkflowTopic::Steps
            }
            WorkflowEvent::Message { .. } => WorkflowTopic::Log,
        }
    }

    fn source(&self) -> &'static str {
        "workflow-runner"
    }
}
