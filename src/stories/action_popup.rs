/// Popup asking for an action name.
#[derive(Debug, Clone, Default)]
pub struct ActionNamePopup {
    open: bool,
    input: Option<String>,
}

impl ActionNamePopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn set_input(&mut self, name: impl Into<String>) {
        self.input = Some(name.into());
    }

    /// Close the popup and hand back whatever was typed.
    pub fn submit(&mut self) -> Option<String> {
        self.open = false;
        self.input.take()
    }
}
