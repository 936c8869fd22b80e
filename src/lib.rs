pub mod dashboard;
pub mod logging;
pub mod settings;
pub mod stories;
