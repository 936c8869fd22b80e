pub mod cards;
pub mod config;
pub mod dashboard;
pub mod drag;
pub mod error;
pub mod format;
pub mod layout;
pub mod persistence;
pub mod query;
pub mod store;

pub use cards::{CardRegistry, CardRegistryEntry, ChartType, GraphSpec, QuerySpec, SeriesSpec};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardCommand, DashboardEvent, EventCallback};
pub use drag::{DragState, DragTracker, DropEvent};
pub use error::DashboardError;
pub use layout::{compose, RenderableCard};
pub use persistence::{
    JsonFilePersistence, MemoryPersistence, PersistenceWriter, SettingsPersistence,
};
pub use query::{DataPoint, EnvironmentContext, QueryExecutor, QueryRequest};
pub use store::{CardSettings, CardSettingsStore, ValueType};
