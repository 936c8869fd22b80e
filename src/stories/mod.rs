pub mod action_popup;
pub mod bot_response;

pub use action_popup::ActionNamePopup;
pub use bot_response::{BotResponse, BotResponseEditor, EditorMode, TrashOutcome};
