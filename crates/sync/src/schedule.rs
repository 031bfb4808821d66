//! Drag-and-drop rescheduling: turns a pointer gesture ending on a calendar cell into a
//! task reschedule on the [`TasksStore`].

use chrono::NaiveDate;
use lifeos_core::model::{ResourceId, Task};

use crate::collection::StoreError;
use crate::tasks::TasksStore;

/// Pointer travel, in pixels, before a press becomes a drag.
pub const ACTIVATION_DISTANCE: f64 = 8.0;

const DATE_TARGET_PREFIX: &str = "date-";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Parse a calendar cell id (`date-YYYY-MM-DD`) into its date.
pub fn drop_target_date(target: &str) -> Option<NaiveDate> {
    let raw = target.strip_prefix(DATE_TARGET_PREFIX)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn drop_target_id(date: NaiveDate) -> String {
    format!("{}{}", DATE_TARGET_PREFIX, date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer is down on a task but has not travelled far enough to count as a drag.
    Pressed { task_id: ResourceId, origin: Point },
    Dragging { task_id: ResourceId, pointer: Point },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Released before activation; the UI treats this as a click on the card.
    Click(ResourceId),
    Dropped { task_id: ResourceId, date: NaiveDate },
    Cancelled,
    /// Pointer event that does not belong to any gesture.
    Ignored,
}

#[derive(Debug)]
pub struct DragController {
    tasks: TasksStore,
    phase: DragPhase,
}

impl DragController {
    pub fn new(tasks: TasksStore) -> Self {
        Self {
            tasks,
            phase: DragPhase::Idle,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Task currently being dragged, if the gesture has activated.
    pub fn active_task(&self) -> Option<ResourceId> {
        match self.phase {
            DragPhase::Dragging { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Start a gesture on `task_id`. Returns false while another gesture is in progress.
    pub fn pointer_down(&mut self, task_id: ResourceId, at: Point) -> bool {
        if self.phase != DragPhase::Idle {
            tracing::debug!(task_id, "pointer down ignored, gesture already active");
            return false;
        }
        self.phase = DragPhase::Pressed {
            task_id,
            origin: at,
        };
        true
    }

    /// Returns true on the move that activates the drag.
    pub fn pointer_move(&mut self, at: Point) -> bool {
        match self.phase {
            DragPhase::Pressed { task_id, origin } => {
                if origin.distance_to(at) < ACTIVATION_DISTANCE {
                    return false;
                }
                tracing::debug!(task_id, "drag activated");
                self.phase = DragPhase::Dragging {
                    task_id,
                    pointer: at,
                };
                true
            }
            DragPhase::Dragging { task_id, .. } => {
                self.phase = DragPhase::Dragging {
                    task_id,
                    pointer: at,
                };
                false
            }
            DragPhase::Idle => false,
        }
    }

    /// End the gesture over `target` (a drop-target id, or `None` when over nothing).
    pub fn pointer_up(&mut self, target: Option<&str>) -> DragOutcome {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        match phase {
            DragPhase::Idle => DragOutcome::Ignored,
            DragPhase::Pressed { task_id, .. } => DragOutcome::Click(task_id),
            DragPhase::Dragging { task_id, .. } => match target.and_then(drop_target_date) {
                Some(date) => {
                    tracing::info!(task_id, %date, "task dropped on calendar");
                    DragOutcome::Dropped { task_id, date }
                }
                None => {
                    tracing::debug!(task_id, ?target, "drag cancelled, no valid target");
                    DragOutcome::Cancelled
                }
            },
        }
    }

    /// Escape key, window blur, or the dragged card disappearing.
    pub fn abort(&mut self) -> DragOutcome {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragOutcome::Ignored,
            _ => DragOutcome::Cancelled,
        }
    }

    /// Persist a drop. Other outcomes touch nothing and yield `None`.
    pub async fn commit(&self, outcome: &DragOutcome) -> Option<Result<Task, StoreError>> {
        match outcome {
            DragOutcome::Dropped { task_id, date } => {
                Some(self.tasks.reschedule(*task_id, *date).await)
            }
            _ => None,
        }
    }

    /// [`Self::pointer_up`] followed by [`Self::commit`].
    pub async fn release(
        &mut self,
        target: Option<&str>,
    ) -> (DragOutcome, Option<Result<Task, StoreError>>) {
        let outcome = self.pointer_up(target);
        let committed = self.commit(&outcome).await;
        (outcome, committed)
    }
}
