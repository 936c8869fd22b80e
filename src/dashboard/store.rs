use crate::dashboard::cards::{CardRegistry, CardRegistryEntry, ChartType};
use crate::dashboard::error::DashboardError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Absolute,
    Relative,
}

/// Per-card user preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct CardSettings {
    pub card_id: String,
    pub chart_type: ChartType,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

pub const FIELD_CHART_TYPE: &str = "chartType";
pub const FIELD_VALUE_TYPE: &str = "valueType";
pub const FIELD_VISIBLE: &str = "visible";

impl CardSettings {
    /// Check every field against the card's registry entry.
    pub fn validate(&self, entry: &CardRegistryEntry) -> Result<(), DashboardError> {
        if !entry.allows(self.chart_type) {
            return Err(DashboardError::invalid_value(
                &self.card_id,
                FIELD_CHART_TYPE,
                format!("'{}' is not an allowed chart type", self.chart_type),
            ));
        }
        if self.value_type == ValueType::Relative && !entry.graph.has_relative() {
            return Err(DashboardError::invalid_value(
                &self.card_id,
                FIELD_VALUE_TYPE,
                "card has no relative series",
            ));
        }
        Ok(())
    }

    /// Return a copy with `field` set to `value`. `self` is left untouched so
    /// a rejected edit never becomes visible.
    fn with_field(
        &self,
        entry: &CardRegistryEntry,
        field: &str,
        value: &Value,
    ) -> Result<Self, DashboardError> {
        let mut next = self.clone();
        match field {
            FIELD_CHART_TYPE => {
                next.chart_type = serde_json::from_value(value.clone()).map_err(|_| {
                    DashboardError::invalid_value(
                        &self.card_id,
                        field,
                        format!("{value} is not a chart type"),
                    )
                })?;
            }
            FIELD_VALUE_TYPE => {
                next.value_type = serde_json::from_value(value.clone()).map_err(|_| {
                    DashboardError::invalid_value(
                        &self.card_id,
                        field,
                        format!("{value} is not a value type"),
                    )
                })?;
            }
            FIELD_VISIBLE => {
                next.visible = value.as_bool().ok_or_else(|| {
                    DashboardError::invalid_value(&self.card_id, field, "expected a boolean")
                })?;
            }
            _ => {
                return Err(DashboardError::InvalidField {
                    card_id: self.card_id.clone(),
                    field: field.to_string(),
                })
            }
        }
        next.validate(entry)?;
        Ok(next)
    }
}

/// Ordered mapping from card id to settings.
///
/// Order lives in `order` (position -> id) and records in `records`
/// (id -> settings), so reordering never touches the records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardSettingsStore {
    order: Vec<String>,
    records: HashMap<String, CardSettings>,
    revision: u64,
}

impl CardSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with every registry card in definition order.
    pub fn from_registry(registry: &CardRegistry) -> Self {
        let mut store = Self::default();
        for id in registry.ids() {
            if let Some(settings) = registry.default_settings(id) {
                store.order.push(id.clone());
                store.records.insert(id.clone(), settings);
            }
        }
        store
    }

    /// Build from already sanitized entries. Later duplicates are ignored.
    pub fn from_entries(entries: impl IntoIterator<Item = CardSettings>) -> Self {
        let mut store = Self::default();
        for settings in entries {
            if store.records.contains_key(&settings.card_id) {
                continue;
            }
            store.order.push(settings.card_id.clone());
            store.records.insert(settings.card_id.clone(), settings);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Incremented by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.records.contains_key(card_id)
    }

    pub fn get(&self, card_id: &str) -> Result<&CardSettings, DashboardError> {
        self.records
            .get(card_id)
            .ok_or_else(|| DashboardError::NotFound(card_id.to_string()))
    }

    pub fn position(&self, card_id: &str) -> Option<usize> {
        self.order.iter().position(|id| id == card_id)
    }

    /// Card ids in their current order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardSettings> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn set_field(
        &mut self,
        card_id: &str,
        field: &str,
        value: &Value,
        registry: &CardRegistry,
    ) -> Result<&CardSettings, DashboardError> {
        let current = self.get(card_id)?;
        let entry = registry.lookup(card_id)?;
        let next = current.with_field(entry, field, value)?;
        let slot = self
            .records
            .get_mut(card_id)
            .ok_or_else(|| DashboardError::NotFound(card_id.to_string()))?;
        *slot = next;
        self.revision += 1;
        Ok(&*slot)
    }

    /// Exchange the cards at positions `a` and `b`.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), DashboardError> {
        let len = self.order.len();
        for index in [a, b] {
            if index >= len {
                return Err(DashboardError::IndexOutOfRange { index, len });
            }
        }
        if a != b {
            self.order.swap(a, b);
            self.revision += 1;
        }
        Ok(())
    }

    pub fn insert(
        &mut self,
        settings: CardSettings,
        position: usize,
        registry: &CardRegistry,
    ) -> Result<(), DashboardError> {
        let len = self.order.len();
        if position > len {
            return Err(DashboardError::IndexOutOfRange {
                index: position,
                len,
            });
        }
        let entry = registry.lookup(&settings.card_id)?;
        if self.records.contains_key(&settings.card_id) {
            return Err(DashboardError::AlreadyExists(settings.card_id));
        }
        settings.validate(entry)?;
        self.order.insert(position, settings.card_id.clone());
        self.records.insert(settings.card_id.clone(), settings);
        self.revision += 1;
        Ok(())
    }

    /// Remove a card. Removing a card that is not present is an error.
    pub fn remove(&mut self, card_id: &str) -> Result<CardSettings, DashboardError> {
        let settings = self
            .records
            .remove(card_id)
            .ok_or_else(|| DashboardError::NotFound(card_id.to_string()))?;
        self.order.retain(|id| id != card_id);
        self.revision += 1;
        Ok(settings)
    }

    pub fn entries(&self) -> Vec<CardSettings> {
        self.iter().cloned().collect()
    }
}
