use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotResponse {
    pub text: String,
}

impl BotResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Edit,
    View,
}

/// What the trash button means in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashOutcome {
    /// Discard the edit in progress.
    Abort,
    /// Delete the response.
    Delete,
}

/// Edit/view state of a single bot response in a story.
#[derive(Debug, Clone)]
pub struct BotResponseEditor {
    value: BotResponse,
    input: String,
    mode: EditorMode,
    deletable: bool,
}

fn mode_for(value: &BotResponse) -> EditorMode {
    if value.text.trim().is_empty() {
        EditorMode::Edit
    } else {
        EditorMode::View
    }
}

impl BotResponseEditor {
    pub fn new(value: BotResponse) -> Self {
        Self {
            mode: mode_for(&value),
            input: value.text.clone(),
            value,
            deletable: true,
        }
    }

    pub fn with_deletable(mut self, deletable: bool) -> Self {
        self.deletable = deletable;
        self
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn value(&self) -> &BotResponse {
        &self.value
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Commit the input. Blank input keeps the editor open and yields nothing.
    pub fn validate(&mut self) -> Option<BotResponse> {
        if self.input.trim().is_empty() {
            return None;
        }
        self.mode = EditorMode::View;
        Some(BotResponse::new(self.input.clone()))
    }

    pub fn click(&mut self) {
        if self.mode == EditorMode::View {
            self.mode = EditorMode::Edit;
        }
    }

    pub fn trash(&self) -> Option<TrashOutcome> {
        if !self.deletable {
            return None;
        }
        Some(match self.mode {
            EditorMode::Edit => TrashOutcome::Abort,
            EditorMode::View => TrashOutcome::Delete,
        })
    }

    /// Adopt a value changed from outside; pending input is discarded.
    pub fn sync(&mut self, value: BotResponse) {
        self.mode = mode_for(&value);
        self.input = value.text.clone();
        self.value = value;
    }
}
