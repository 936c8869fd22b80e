use crate::dashboard::error::DashboardError;
use crate::dashboard::format::{display_raw, ValueFormat};
use crate::dashboard::store::{CardSettings, ValueType};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data source of a card: which named query to run and whether its results
/// are bucketed over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub query_name: String,
    #[serde(default)]
    pub temporal: bool,
}

/// One plotted series. `abs` names the absolute field, `rel` the optional
/// relative counterpart shown when the card is in relative mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub abs: String,
    #[serde(default)]
    pub rel: Option<String>,
}

impl SeriesSpec {
    pub fn abs(field: &str) -> Self {
        Self {
            abs: field.to_string(),
            rel: None,
        }
    }

    pub fn with_rel(abs: &str, rel: &str) -> Self {
        Self {
            abs: abs.to_string(),
            rel: Some(rel.to_string()),
        }
    }
}

/// Axis and field mapping of a card's graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub x: String,
    pub y: Vec<SeriesSpec>,
    #[serde(default)]
    pub formats: BTreeMap<String, ValueFormat>,
    #[serde(default)]
    pub axis_bottom_tick_rotation: Option<i32>,
    /// Series plotted instead of `y` in relative mode, when they differ.
    #[serde(default)]
    pub relative_y: Vec<SeriesSpec>,
}

impl GraphSpec {
    pub fn new(x: &str, y: Vec<SeriesSpec>) -> Self {
        Self {
            x: x.to_string(),
            y,
            formats: BTreeMap::new(),
            axis_bottom_tick_rotation: None,
            relative_y: Vec::new(),
        }
    }

    pub fn with_format(mut self, field: &str, format: ValueFormat) -> Self {
        self.formats.insert(field.to_string(), format);
        self
    }

    pub fn with_tick_rotation(mut self, degrees: i32) -> Self {
        self.axis_bottom_tick_rotation = Some(degrees);
        self
    }

    pub fn with_relative_y(mut self, series: Vec<SeriesSpec>) -> Self {
        self.relative_y = series;
        self
    }

    pub fn has_relative(&self) -> bool {
        self.y.iter().any(|s| s.rel.is_some())
    }

    /// Series to plot for the given value type.
    pub fn series(&self, value_type: ValueType) -> &[SeriesSpec] {
        match value_type {
            ValueType::Relative if !self.relative_y.is_empty() => &self.relative_y,
            _ => &self.y,
        }
    }

    pub fn format(&self, field: &str, value: &Value) -> String {
        match self.formats.get(field) {
            Some(fmt) => fmt.apply(value),
            None => display_raw(value),
        }
    }
}

/// Static description of a card: how it is titled, queried and drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRegistryEntry {
    pub card_id: String,
    pub title: String,
    pub description: String,
    pub chart_type_options: Vec<ChartType>,
    pub query: QuerySpec,
    pub graph: GraphSpec,
}

impl CardRegistryEntry {
    pub fn new(card_id: &str, title: &str, description: &str) -> Self {
        Self {
            card_id: card_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            chart_type_options: Vec::new(),
            query: QuerySpec {
                query_name: card_id.to_string(),
                temporal: false,
            },
            graph: GraphSpec::new("x", vec![SeriesSpec::abs("y")]),
        }
    }

    pub fn with_chart_types(mut self, options: &[ChartType]) -> Self {
        self.chart_type_options = options.to_vec();
        self
    }

    pub fn with_query(mut self, query_name: &str, temporal: bool) -> Self {
        self.query = QuerySpec {
            query_name: query_name.to_string(),
            temporal,
        };
        self
    }

    pub fn with_graph(mut self, graph: GraphSpec) -> Self {
        self.graph = graph;
        self
    }

    pub fn allows(&self, chart_type: ChartType) -> bool {
        self.chart_type_options.contains(&chart_type)
    }

    /// Settings a freshly added card starts with. Only entries held by a
    /// [`CardRegistry`] are guaranteed to have a chart type option; use
    /// [`CardRegistry::default_settings`] from outside the crate.
    pub(crate) fn default_settings(&self) -> CardSettings {
        CardSettings {
            card_id: self.card_id.clone(),
            chart_type: self.chart_type_options[0],
            value_type: ValueType::Absolute,
            visible: true,
        }
    }

    fn validate(&self) -> Result<(), DashboardError> {
        if self.card_id.trim().is_empty() {
            return Err(DashboardError::RegistryConfig(
                "card definition without an id".into(),
            ));
        }
        if self.chart_type_options.is_empty() {
            return Err(DashboardError::RegistryConfig(format!(
                "card '{}' has no chart type options",
                self.card_id
            )));
        }
        let mut seen = HashSet::new();
        for chart in &self.chart_type_options {
            if !seen.insert(*chart) {
                return Err(DashboardError::RegistryConfig(format!(
                    "card '{}' lists chart type '{chart}' twice",
                    self.card_id
                )));
            }
        }
        Ok(())
    }
}

/// Read-only catalog of every card the dashboard knows how to show.
#[derive(Debug, Clone, Default)]
pub struct CardRegistry {
    map: HashMap<String, CardRegistryEntry>,
    order: Vec<String>,
}

impl CardRegistry {
    /// Build a registry from a definition list. Fails if any card has no
    /// chart type options or if two definitions share an id.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = CardRegistryEntry>,
    ) -> Result<Self, DashboardError> {
        let mut reg = Self::default();
        for entry in definitions {
            entry.validate()?;
            if reg.map.contains_key(&entry.card_id) {
                return Err(DashboardError::RegistryConfig(format!(
                    "card '{}' defined twice",
                    entry.card_id
                )));
            }
            reg.order.push(entry.card_id.clone());
            reg.map.insert(entry.card_id.clone(), entry);
        }
        tracing::debug!(cards = reg.order.len(), "card registry initialised");
        Ok(reg)
    }

    /// Registry of the built-in analytics cards.
    pub fn with_defaults() -> Result<Self, DashboardError> {
        Self::from_definitions(DEFAULT_CARDS.iter().cloned())
    }

    pub fn lookup(&self, card_id: &str) -> Result<&CardRegistryEntry, DashboardError> {
        self.map
            .get(card_id)
            .ok_or_else(|| DashboardError::NotFound(card_id.to_string()))
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.map.contains_key(card_id)
    }

    /// Card ids in definition order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn default_settings(&self, card_id: &str) -> Option<CardSettings> {
        self.map.get(card_id).map(|e| e.default_settings())
    }
}

static DEFAULT_CARDS: Lazy<Vec<CardRegistryEntry>> = Lazy::new(default_definitions);

fn default_definitions() -> Vec<CardRegistryEntry> {
    use ChartType::*;
    vec![
        CardRegistryEntry::new(
            "conversationLengths",
            "Conversation Length",
            "The number of user utterances contained in a conversation.",
        )
        .with_chart_types(&[Bar, Pie])
        .with_query("conversationLengths", false)
        .with_graph(
            GraphSpec::new("length", vec![SeriesSpec::with_rel("count", "frequency")])
                .with_format("length", ValueFormat::plural("utterance")),
        ),
        CardRegistryEntry::new(
            "intentFrequencies",
            "Top 10 Intents",
            "The number of user utterances classified as having a given intent.",
        )
        .with_chart_types(&[Bar, Pie])
        .with_query("intentFrequencies", false)
        .with_graph(
            GraphSpec::new("name", vec![SeriesSpec::with_rel("count", "frequency")])
                .with_tick_rotation(-25),
        ),
        CardRegistryEntry::new(
            "conversationDurations",
            "Conversation Duration",
            "The number of seconds elapsed between the first and the last message of a conversation.",
        )
        .with_chart_types(&[Bar, Pie])
        .with_query("conversationDurations", false)
        .with_graph(
            GraphSpec::new("duration", vec![SeriesSpec::with_rel("count", "frequency")])
                .with_format("duration", ValueFormat::suffix(" s")),
        ),
        CardRegistryEntry::new(
            "fallbackCounts",
            "Fallback",
            "The number of times the bot uttered fallback (out of all bot utterances).",
        )
        .with_chart_types(&[Line])
        .with_query("responseCounts", true)
        .with_graph(
            GraphSpec::new("bucket", vec![SeriesSpec::with_rel("count", "proportion")])
                .with_format("bucket", ValueFormat::LocaleDate)
                .with_format("proportion", ValueFormat::Percent)
                .with_relative_y(vec![SeriesSpec::abs("proportion")]),
        ),
        CardRegistryEntry::new(
            "visitCounts",
            "Visits & Engagement",
            "Visits: the total number of conversations in a given temporal window. Engagements: of those conversations, those with length one or more.",
        )
        .with_chart_types(&[Line])
        .with_query("conversationCounts", true)
        .with_graph(
            GraphSpec::new(
                "bucket",
                vec![
                    SeriesSpec::abs("count"),
                    SeriesSpec::with_rel("engagements", "proportion"),
                ],
            )
            .with_format("bucket", ValueFormat::LocaleDate)
            .with_format("count", ValueFormat::plural("visit"))
            .with_format("engagements", ValueFormat::plural("engagement"))
            .with_format("proportion", ValueFormat::Percent)
            .with_relative_y(vec![SeriesSpec::abs("proportion")]),
        ),
    ]
}
