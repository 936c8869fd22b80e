use crate::dashboard::cards::{CardRegistry, ChartType, GraphSpec, SeriesSpec};
use crate::dashboard::query::{DataPoint, EnvironmentContext, QueryExecutor, QueryRequest};
use crate::dashboard::store::{CardSettings, CardSettingsStore};
use serde::Serialize;
use siphasher::sip::SipHasher24;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Field name to display string for one result row.
pub type FormattedRow = BTreeMap<String, String>;

/// A card ready for display: registry metadata joined with user settings and
/// a query request bound to the current environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderableCard {
    pub position: usize,
    pub card_id: String,
    pub title: String,
    pub description: String,
    pub chart_type_options: Vec<ChartType>,
    pub settings: CardSettings,
    pub request: QueryRequest,
    pub graph: GraphSpec,
}

impl RenderableCard {
    /// Series plotted under the card's current value type.
    pub fn series(&self) -> &[SeriesSpec] {
        self.graph.series(self.settings.value_type)
    }

    pub fn format_point(&self, point: &DataPoint) -> FormattedRow {
        point
            .iter()
            .map(|(field, value)| (field.clone(), self.graph.format(field, value)))
            .collect()
    }

    /// Run this card's query and format every returned row.
    pub fn fetch(&self, executor: &dyn QueryExecutor) -> anyhow::Result<Vec<FormattedRow>> {
        let rows = executor.execute(&self.request)?;
        Ok(rows.iter().map(|row| self.format_point(row)).collect())
    }
}

/// Join the store order with the registry. Cards the registry does not know
/// are skipped.
pub fn compose(
    store: &CardSettingsStore,
    registry: &CardRegistry,
    env: &EnvironmentContext,
) -> Vec<RenderableCard> {
    let mut cards = Vec::with_capacity(store.len());
    for (position, settings) in store.iter().enumerate() {
        let Ok(entry) = registry.lookup(&settings.card_id) else {
            tracing::debug!(card = %settings.card_id, "skipping card missing from registry");
            continue;
        };
        cards.push(RenderableCard {
            position,
            card_id: entry.card_id.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            chart_type_options: entry.chart_type_options.clone(),
            settings: settings.clone(),
            request: env.request_for(&entry.query),
            graph: entry.graph.clone(),
        });
    }
    cards
}

/// Hash of everything about a card that affects how it is drawn.
pub fn card_fingerprint(card: &RenderableCard) -> u64 {
    let mut hasher = SipHasher24::new_with_keys(0, 0);
    hasher.write_u64(card.position as u64);
    card.settings.hash(&mut hasher);
    card.request.hash(&mut hasher);
    hasher.finish()
}
