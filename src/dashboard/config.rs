use crate::dashboard::cards::CardRegistry;
use crate::dashboard::store::{CardSettings, CardSettingsStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

pub const CARD_SETTINGS_FILE: &str = "card_settings.json";

fn default_version() -> u32 {
    1
}

/// A stored card entry that did not parse as [`CardSettings`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnreadableCard {
    position: usize,
    card_id: Option<String>,
    visible: Option<bool>,
    reason: String,
}

/// On-disk shape. Cards are parsed one by one so a single bad entry does not
/// discard the rest of the layout.
#[derive(Deserialize)]
struct StoredLayout {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    cards: Vec<Value>,
}

impl From<StoredLayout> for DashboardConfig {
    fn from(raw: StoredLayout) -> Self {
        let mut cards = Vec::with_capacity(raw.cards.len());
        let mut unreadable = Vec::new();
        for (position, value) in raw.cards.into_iter().enumerate() {
            match serde_json::from_value::<CardSettings>(value.clone()) {
                Ok(card) => cards.push(card),
                Err(err) => unreadable.push(UnreadableCard {
                    position,
                    card_id: value.get("cardId").and_then(Value::as_str).map(str::to_string),
                    visible: value.get("visible").and_then(Value::as_bool),
                    reason: err.to_string(),
                }),
            }
        }
        Self {
            version: raw.version,
            cards,
            unreadable,
        }
    }
}

/// Persisted form of the card settings store. `cards` order is the
/// dashboard order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredLayout")]
pub struct DashboardConfig {
    pub version: u32,
    pub cards: Vec<CardSettings>,
    #[serde(skip)]
    pub(crate) unreadable: Vec<UnreadableCard>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DashboardConfig {
    pub fn new(cards: Vec<CardSettings>) -> Self {
        Self {
            version: default_version(),
            cards,
            unreadable: Vec::new(),
        }
    }

    /// Every registry card with its default settings, in definition order.
    pub fn defaults(registry: &CardRegistry) -> Self {
        Self::from_store(&CardSettingsStore::from_registry(registry))
    }

    pub fn from_store(store: &CardSettingsStore) -> Self {
        Self::new(store.entries())
    }

    pub fn into_store(self) -> CardSettingsStore {
        CardSettingsStore::from_entries(self.cards)
    }

    /// Read a layout from disk. A missing or empty file yields `None`. The
    /// result is not sanitized.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(None);
        }
        let cfg: DashboardConfig = serde_json::from_str(&content)?;
        Ok(Some(cfg))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Number of stored entries that could not be read and await
    /// [`sanitize`](Self::sanitize).
    pub fn unreadable_count(&self) -> usize {
        self.unreadable.len()
    }

    /// Drop orphaned and duplicated cards and reset settings the registry no
    /// longer allows. Unreadable entries of known cards come back with their
    /// defaults at their stored position. Returns a warning per repair.
    pub fn sanitize(&mut self, registry: &CardRegistry) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut dropped = 0;
        for bad in std::mem::take(&mut self.unreadable) {
            let restored = bad
                .card_id
                .as_deref()
                .and_then(|id| registry.default_settings(id));
            let Some(mut settings) = restored else {
                warnings.push(format!(
                    "unreadable dashboard card entry #{} dropped: {}",
                    bad.position, bad.reason
                ));
                dropped += 1;
                continue;
            };
            warnings.push(format!(
                "unreadable settings for dashboard card '{}' reset to defaults: {}",
                settings.card_id, bad.reason
            ));
            if let Some(visible) = bad.visible {
                settings.visible = visible;
            }
            let at = (bad.position - dropped).min(self.cards.len());
            self.cards.insert(at, settings);
        }
        let mut seen = HashSet::new();
        self.cards.retain(|card| {
            if !registry.contains(&card.card_id) {
                warnings.push(format!("unknown dashboard card '{}' dropped", card.card_id));
                return false;
            }
            if !seen.insert(card.card_id.clone()) {
                warnings.push(format!("duplicate dashboard card '{}' dropped", card.card_id));
                return false;
            }
            true
        });
        for card in &mut self.cards {
            let Ok(entry) = registry.lookup(&card.card_id) else {
                continue;
            };
            if let Err(err) = card.validate(entry) {
                warnings.push(format!("{err}; settings reset to defaults"));
                let visible = card.visible;
                *card = entry.default_settings();
                card.visible = visible;
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::cards::ChartType;
    use crate::dashboard::store::ValueType;

    fn card(id: &str, chart: ChartType) -> CardSettings {
        CardSettings {
            card_id: id.into(),
            chart_type: chart,
            value_type: ValueType::Absolute,
            visible: true,
        }
    }

    #[test]
    fn sanitize_drops_orphans_and_duplicates() {
        let registry = CardRegistry::with_defaults().unwrap();
        let mut cfg = DashboardConfig::new(vec![
            card("conversationLengths", ChartType::Bar),
            card("Z", ChartType::Bar),
            card("conversationLengths", ChartType::Pie),
            card("visitCounts", ChartType::Line),
        ]);
        let warnings = cfg.sanitize(&registry);
        assert_eq!(warnings.len(), 2);
        let ids: Vec<_> = cfg.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, ["conversationLengths", "visitCounts"]);
        assert_eq!(cfg.cards[0].chart_type, ChartType::Bar);
    }

    #[test]
    fn sanitize_resets_disallowed_chart_type() {
        let registry = CardRegistry::with_defaults().unwrap();
        let mut invalid = card("fallbackCounts", ChartType::Pie);
        invalid.visible = false;
        let mut cfg = DashboardConfig::new(vec![invalid]);
        let warnings = cfg.sanitize(&registry);
        assert_eq!(warnings.len(), 1);
        assert_eq!(cfg.cards[0].chart_type, ChartType::Line);
        assert!(!cfg.cards[0].visible);
    }

    #[test]
    fn defaults_cover_registry() {
        let registry = CardRegistry::with_defaults().unwrap();
        let cfg = DashboardConfig::defaults(&registry);
        assert_eq!(cfg.cards.len(), registry.len());
        assert_eq!(cfg.version, 1);
    }

    #[test]
    fn unreadable_card_keeps_its_place() {
        let registry = CardRegistry::with_defaults().unwrap();
        let mut cfg: DashboardConfig = serde_json::from_value(serde_json::json!({
            "cards": [
                {"cardId": "visitCounts", "chartType": "line"},
                {"cardId": "conversationLengths", "chartType": "area", "visible": false},
                {"chartType": 7},
                {"cardId": "fallbackCounts", "chartType": "line"}
            ]
        }))
        .unwrap();
        assert_eq!(cfg.cards.len(), 2);
        assert_eq!(cfg.unreadable_count(), 2);

        let warnings = cfg.sanitize(&registry);
        assert_eq!(warnings.len(), 2);
        assert_eq!(cfg.unreadable_count(), 0);
        let ids: Vec<_> = cfg.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, ["visitCounts", "conversationLengths", "fallbackCounts"]);
        assert_eq!(cfg.cards[1].chart_type, ChartType::Bar);
        assert!(!cfg.cards[1].visible);
    }

    #[test]
    fn unreadable_entry_after_dropped_one_is_placed_correctly() {
        let registry = CardRegistry::with_defaults().unwrap();
        let mut cfg: DashboardConfig = serde_json::from_value(serde_json::json!({
            "cards": [
                "garbage",
                {"cardId": "visitCounts", "chartType": "line"},
                {"cardId": "intentFrequencies", "valueType": "sideways", "chartType": "bar"},
                {"cardId": "fallbackCounts", "chartType": "line"}
            ]
        }))
        .unwrap();
        cfg.sanitize(&registry);
        let ids: Vec<_> = cfg.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, ["visitCounts", "intentFrequencies", "fallbackCounts"]);
    }
}
