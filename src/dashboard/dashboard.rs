use crate::dashboard::cards::CardRegistry;
use crate::dashboard::config::DashboardConfig;
use crate::dashboard::drag::{DragState, DragTracker, DropEvent};
use crate::dashboard::error::DashboardError;
use crate::dashboard::layout::{card_fingerprint, compose, RenderableCard};
use crate::dashboard::persistence::{PersistenceWriter, SettingsPersistence};
use crate::dashboard::query::EnvironmentContext;
use crate::dashboard::store::CardSettingsStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardEvent {
    /// The card list was recomputed; `changed` lists cards drawn differently.
    Recomposed { changed: Vec<String> },
    PreferencesReset,
    Rejected { code: &'static str },
}

pub type EventCallback = Arc<dyn Fn(DashboardEvent) + Send + Sync>;

/// A single user interaction that may change the dashboard.
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardCommand {
    SetField {
        card_id: String,
        field: String,
        value: Value,
    },
    Swap {
        a: usize,
        b: usize,
    },
    Drop(DropEvent),
    Insert {
        card_id: String,
        position: usize,
    },
    Remove {
        card_id: String,
    },
    Reset,
    SetEnvironment(EnvironmentContext),
}

/// Owner of the card settings. Every successful change is persisted and the
/// card list recomputed before the call returns.
pub struct Dashboard {
    registry: CardRegistry,
    store: CardSettingsStore,
    env: EnvironmentContext,
    drag: DragTracker,
    cards: Vec<RenderableCard>,
    hashes: HashMap<String, u64>,
    last_changed: Vec<String>,
    writer: PersistenceWriter,
    write_seq: u64,
    pub warnings: Vec<String>,
    event_cb: Option<EventCallback>,
}

impl Dashboard {
    pub fn new(
        registry: CardRegistry,
        persistence: Arc<dyn SettingsPersistence>,
        env: EnvironmentContext,
        event_cb: Option<EventCallback>,
    ) -> anyhow::Result<Self> {
        let (store, warnings) = Self::load_internal(persistence.as_ref(), &registry);
        let writer = PersistenceWriter::spawn(persistence)?;
        let mut dashboard = Self {
            registry,
            store,
            env,
            drag: DragTracker::new(),
            cards: Vec::new(),
            hashes: HashMap::new(),
            last_changed: Vec::new(),
            writer,
            write_seq: 0,
            warnings,
            event_cb: None,
        };
        dashboard.recompute();
        dashboard.event_cb = event_cb;
        Ok(dashboard)
    }

    fn load_internal(
        persistence: &dyn SettingsPersistence,
        registry: &CardRegistry,
    ) -> (CardSettingsStore, Vec<String>) {
        match persistence.load() {
            Ok(Some(mut cfg)) => {
                let warnings = cfg.sanitize(registry);
                for w in &warnings {
                    tracing::warn!("{w}");
                }
                (cfg.into_store(), warnings)
            }
            Ok(None) => (CardSettingsStore::from_registry(registry), Vec::new()),
            Err(e) => {
                tracing::warn!("failed to load card settings, using defaults: {e}");
                (
                    CardSettingsStore::from_registry(registry),
                    vec![format!("stored card settings unreadable: {e}")],
                )
            }
        }
    }

    pub fn apply(&mut self, command: DashboardCommand) -> Result<(), DashboardError> {
        match command {
            DashboardCommand::SetField {
                card_id,
                field,
                value,
            } => self.set_card_setting(&card_id, &field, value),
            DashboardCommand::Swap { a, b } => self.swap_cards(a, b),
            DashboardCommand::Drop(event) => self.handle_drop(&event),
            DashboardCommand::Insert { card_id, position } => self.insert_card(&card_id, position),
            DashboardCommand::Remove { card_id } => self.remove_card(&card_id),
            DashboardCommand::Reset => {
                self.reset_preferences();
                Ok(())
            }
            DashboardCommand::SetEnvironment(env) => {
                self.set_environment(env);
                Ok(())
            }
        }
    }

    pub fn set_card_setting(
        &mut self,
        card_id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), DashboardError> {
        self.mutate(|store, registry| {
            store.set_field(card_id, field, &value, registry).map(|_| ())
        })
    }

    pub fn swap_cards(&mut self, a: usize, b: usize) -> Result<(), DashboardError> {
        self.mutate(|store, _| store.swap(a, b))
    }

    /// Apply a completed drag as a single swap.
    pub fn handle_drop(&mut self, event: &DropEvent) -> Result<(), DashboardError> {
        tracing::debug!(
            card = %event.dragged_id,
            from = event.source_position,
            to = event.destination_position,
            "card dropped"
        );
        self.swap_cards(event.source_position, event.destination_position)
    }

    pub fn begin_drag(&mut self, card_id: &str) -> Result<(), DashboardError> {
        let position = self
            .store
            .position(card_id)
            .ok_or_else(|| DashboardError::NotFound(card_id.to_string()))?;
        self.drag.begin(card_id, position);
        Ok(())
    }

    /// Drop the dragged card at `destination`. Returns `false` when no drag
    /// was in progress.
    pub fn finish_drag(&mut self, destination: usize) -> Result<bool, DashboardError> {
        match self.drag.drop_at(destination) {
            Some(event) => self.handle_drop(&event).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn insert_card(&mut self, card_id: &str, position: usize) -> Result<(), DashboardError> {
        self.mutate(|store, registry| {
            let settings = registry.lookup(card_id)?.default_settings();
            store.insert(settings, position, registry)
        })
    }

    pub fn remove_card(&mut self, card_id: &str) -> Result<(), DashboardError> {
        self.mutate(|store, _| store.remove(card_id).map(|_| ()))
    }

    /// Forget stored preferences and start over from the registry defaults.
    pub fn reset_preferences(&mut self) {
        tracing::info!("resetting dashboard card preferences");
        self.write_seq += 1;
        self.writer.schedule_clear(self.write_seq);
        self.store = CardSettingsStore::from_registry(&self.registry);
        self.persist();
        self.emit(DashboardEvent::PreferencesReset);
        self.recompute();
    }

    pub fn set_environment(&mut self, env: EnvironmentContext) {
        if env == self.env {
            return;
        }
        self.env = env;
        self.recompute();
    }

    /// Wait until every scheduled write has reached storage.
    pub fn flush(&self) {
        self.writer.flush();
    }

    pub fn cards(&self) -> &[RenderableCard] {
        &self.cards
    }

    /// Cards whose rendering changed in the last recomputation.
    pub fn last_changed(&self) -> &[String] {
        &self.last_changed
    }

    pub fn store(&self) -> &CardSettingsStore {
        &self.store
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &EnvironmentContext {
        &self.env
    }

    fn mutate(
        &mut self,
        op: impl FnOnce(&mut CardSettingsStore, &CardRegistry) -> Result<(), DashboardError>,
    ) -> Result<(), DashboardError> {
        let before = self.store.revision();
        if let Err(err) = op(&mut self.store, &self.registry) {
            tracing::warn!(code = err.error_code(), "card settings change rejected: {err}");
            self.emit(DashboardEvent::Rejected {
                code: err.error_code(),
            });
            return Err(err);
        }
        if self.store.revision() != before {
            self.persist();
            self.recompute();
        }
        Ok(())
    }

    fn persist(&mut self) {
        self.write_seq += 1;
        self.writer
            .schedule(self.write_seq, DashboardConfig::from_store(&self.store));
    }

    fn recompute(&mut self) {
        let cards = compose(&self.store, &self.registry, &self.env);
        let mut hashes = HashMap::with_capacity(cards.len());
        let mut changed = Vec::new();
        for card in &cards {
            let hash = card_fingerprint(card);
            if self.hashes.get(&card.card_id) != Some(&hash) {
                changed.push(card.card_id.clone());
            }
            hashes.insert(card.card_id.clone(), hash);
        }
        for id in self.hashes.keys() {
            if !hashes.contains_key(id) {
                changed.push(id.clone());
            }
        }
        self.cards = cards;
        self.hashes = hashes;
        self.last_changed = changed.clone();
        self.emit(DashboardEvent::Recomposed { changed });
    }

    fn emit(&self, event: DashboardEvent) {
        if let Some(cb) = &self.event_cb {
            (cb)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::cards::ChartType;
    use crate::dashboard::persistence::MemoryPersistence;
    use serde_json::json;
    use std::sync::Mutex;

    fn env() -> EnvironmentContext {
        EnvironmentContext::new("p1", "production")
    }

    fn dashboard_with(mem: &MemoryPersistence) -> Dashboard {
        Dashboard::new(
            CardRegistry::with_defaults().unwrap(),
            Arc::new(mem.clone()),
            env(),
            None,
        )
        .unwrap()
    }

    fn ids(d: &Dashboard) -> Vec<String> {
        d.cards().iter().map(|c| c.card_id.clone()).collect()
    }

    #[test]
    fn seeds_defaults_without_writing() {
        let mem = MemoryPersistence::new();
        let d = dashboard_with(&mem);
        d.flush();
        assert_eq!(d.cards().len(), 5);
        assert_eq!(mem.save_count(), 0);
    }

    #[test]
    fn swap_persists_and_recomputes() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.swap_cards(0, 4).unwrap();
        d.flush();
        assert_eq!(ids(&d)[0], "visitCounts");
        assert_eq!(ids(&d)[4], "conversationLengths");
        let mut changed = d.last_changed().to_vec();
        changed.sort();
        assert_eq!(changed, ["conversationLengths", "visitCounts"]);
        assert_eq!(mem.stored().unwrap().cards[0].card_id, "visitCounts");
    }

    #[test]
    fn swap_same_position_writes_nothing() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.swap_cards(1, 1).unwrap();
        d.flush();
        assert_eq!(mem.save_count(), 0);
    }

    #[test]
    fn rejected_change_is_reported() {
        let events = Arc::new(Mutex::new(Vec::<DashboardEvent>::new()));
        let sink = events.clone();
        let mem = MemoryPersistence::new();
        let mut d = Dashboard::new(
            CardRegistry::with_defaults().unwrap(),
            Arc::new(mem.clone()),
            env(),
            Some(Arc::new(move |e: DashboardEvent| sink.lock().unwrap().push(e))),
        )
        .unwrap();
        let before = d.cards().to_vec();
        let err = d
            .set_card_setting("fallbackCounts", "chartType", json!("pie"))
            .unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_VALUE");
        assert_eq!(d.cards(), before.as_slice());
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[DashboardEvent::Rejected {
                code: "E_INVALID_VALUE"
            }]
        );
        d.flush();
        assert_eq!(mem.save_count(), 0);
    }

    #[test]
    fn drag_cycle_issues_one_swap() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.begin_drag("fallbackCounts").unwrap();
        assert!(d.finish_drag(0).unwrap());
        assert_eq!(ids(&d)[0], "fallbackCounts");
        assert_eq!(ids(&d)[3], "conversationLengths");
        assert!(!d.finish_drag(2).unwrap());

        d.begin_drag("visitCounts").unwrap();
        d.cancel_drag();
        assert_eq!(d.drag_state(), &DragState::Idle);
        d.flush();
        assert_eq!(mem.save_count(), 1);
    }

    #[test]
    fn drop_beyond_end_is_out_of_range() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.begin_drag("visitCounts").unwrap();
        assert!(matches!(
            d.finish_drag(9),
            Err(DashboardError::IndexOutOfRange { index: 9, len: 5 })
        ));
        assert_eq!(ids(&d)[4], "visitCounts");
        assert_eq!(d.drag_state(), &DragState::Idle);
    }

    #[test]
    fn insert_persists_and_rejections_change_nothing() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.remove_card("visitCounts").unwrap();
        d.apply(DashboardCommand::Insert {
            card_id: "visitCounts".into(),
            position: 0,
        })
        .unwrap();
        d.flush();
        assert_eq!(ids(&d)[0], "visitCounts");
        assert_eq!(d.cards().len(), 5);
        assert!(d.last_changed().contains(&"visitCounts".to_string()));
        let stored = mem.stored().unwrap();
        assert_eq!(stored.cards.len(), 5);
        assert_eq!(stored.cards[0].card_id, "visitCounts");
        assert_eq!(stored.cards[1].card_id, "conversationLengths");

        let saves = mem.save_count();
        let before = d.cards().to_vec();
        assert_eq!(
            d.insert_card("visitCounts", 2).unwrap_err(),
            DashboardError::AlreadyExists("visitCounts".into())
        );
        assert!(matches!(
            d.insert_card("visitCounts", 9),
            Err(DashboardError::IndexOutOfRange { index: 9, len: 5 })
        ));
        assert!(matches!(
            d.insert_card("retiredCard", 0),
            Err(DashboardError::NotFound(_))
        ));
        d.flush();
        assert_eq!(d.cards(), before.as_slice());
        assert_eq!(mem.save_count(), saves);
        assert_eq!(mem.stored().unwrap(), stored);
    }

    #[test]
    fn reset_restores_defaults() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.remove_card("visitCounts").unwrap();
        d.set_card_setting("conversationLengths", "chartType", json!("pie"))
            .unwrap();
        d.apply(DashboardCommand::Reset).unwrap();
        d.flush();
        assert_eq!(d.cards().len(), 5);
        assert_eq!(d.cards()[0].settings.chart_type, ChartType::Bar);
        assert_eq!(mem.stored().unwrap(), DashboardConfig::defaults(d.registry()));
    }

    #[test]
    fn environment_change_recomposes_without_writing() {
        let mem = MemoryPersistence::new();
        let mut d = dashboard_with(&mem);
        d.apply(DashboardCommand::SetEnvironment(EnvironmentContext::new(
            "p1",
            "development",
        )))
        .unwrap();
        assert_eq!(d.last_changed().len(), 5);
        assert!(d.cards().iter().all(|c| c.request.envs.len() == 2));
        d.flush();
        assert_eq!(mem.save_count(), 0);
    }

    #[test]
    fn loads_and_sanitizes_stored_layout() {
        let registry = CardRegistry::with_defaults().unwrap();
        let mut cfg = DashboardConfig::defaults(&registry);
        cfg.cards.reverse();
        cfg.cards[0].card_id = "removedCard".into();
        let mem = MemoryPersistence::with_config(cfg);
        let d = dashboard_with(&mem);
        assert_eq!(d.cards().len(), 4);
        assert_eq!(d.cards()[0].card_id, "fallbackCounts");
        assert_eq!(d.warnings.len(), 1);
    }
}
