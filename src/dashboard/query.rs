use crate::dashboard::cards::QuerySpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Environment whose data also includes events recorded without one.
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// A single row returned by the query layer, e.g. `{"length": 2, "count": 14}`.
pub type DataPoint = Map<String, Value>;

/// Project and deployment environment currently selected in the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub project_id: String,
    pub environment: String,
}

impl EnvironmentContext {
    pub fn new(project_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            environment: environment.into(),
        }
    }

    /// Environments to query. `None` stands for data without an environment
    /// and is only included for development.
    pub fn envs(&self) -> Vec<Option<String>> {
        let mut envs = vec![Some(self.environment.clone())];
        if self.environment == DEVELOPMENT_ENVIRONMENT {
            envs.push(None);
        }
        envs
    }

    pub fn request_for(&self, query: &QuerySpec) -> QueryRequest {
        QueryRequest {
            query_name: query.query_name.clone(),
            project_id: self.project_id.clone(),
            envs: self.envs(),
            temporal: query.temporal,
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Descriptor handed to the query layer for one card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query_name: String,
    pub project_id: String,
    pub envs: Vec<Option<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub temporal: bool,
}

/// Runs card queries. Implemented outside this crate.
pub trait QueryExecutor {
    fn execute(&self, request: &QueryRequest) -> anyhow::Result<Vec<DataPoint>>;
}

impl<F> QueryExecutor for F
where
    F: Fn(&QueryRequest) -> anyhow::Result<Vec<DataPoint>>,
{
    fn execute(&self, request: &QueryRequest) -> anyhow::Result<Vec<DataPoint>> {
        self(request)
    }
}
