use serde::{Deserialize, Serialize};

/// Emitted by the drag source when a card is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropEvent {
    pub dragged_id: String,
    pub source_position: usize,
    pub destination_position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        dragged_id: String,
        source_position: usize,
    },
}

/// Tracks one drag gesture at a time.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    state: DragState,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start dragging. A gesture already in progress is abandoned.
    pub fn begin(&mut self, dragged_id: &str, source_position: usize) {
        if let DragState::Dragging { dragged_id, .. } = &self.state {
            tracing::debug!(card = %dragged_id, "previous drag abandoned");
        }
        self.state = DragState::Dragging {
            dragged_id: dragged_id.to_string(),
            source_position,
        };
    }

    /// Finish the gesture. Returns the drop to apply, or `None` when idle.
    pub fn drop_at(&mut self, destination_position: usize) -> Option<DropEvent> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging {
                dragged_id,
                source_position,
            } => Some(DropEvent {
                dragged_id,
                source_position,
                destination_position,
            }),
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
