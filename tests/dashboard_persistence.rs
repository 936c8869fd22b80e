use analytics_dashboard::dashboard::{
    CardRegistry, ChartType, Dashboard, DashboardCommand, DropEvent, JsonFilePersistence,
    SettingsPersistence,
};
use analytics_dashboard::dashboard::query::EnvironmentContext;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn open(persistence: &JsonFilePersistence) -> Dashboard {
    Dashboard::new(
        CardRegistry::with_defaults().unwrap(),
        Arc::new(persistence.clone()),
        EnvironmentContext::new("project", "production"),
        None,
    )
    .unwrap()
}

#[test]
fn changes_survive_reopen() {
    let dir = tempdir().unwrap();
    let persistence = JsonFilePersistence::for_user(dir.path(), "alice");
    {
        let mut dashboard = open(&persistence);
        dashboard
            .apply(DashboardCommand::Drop(DropEvent {
                dragged_id: "visitCounts".into(),
                source_position: 4,
                destination_position: 0,
            }))
            .unwrap();
        dashboard
            .apply(DashboardCommand::SetField {
                card_id: "intentFrequencies".into(),
                field: "chartType".into(),
                value: json!("pie"),
            })
            .unwrap();
    }
    assert!(persistence.path().exists());

    let reopened = open(&persistence);
    assert_eq!(reopened.cards()[0].card_id, "visitCounts");
    assert_eq!(reopened.cards()[4].card_id, "conversationLengths");
    let intents = reopened.store().get("intentFrequencies").unwrap();
    assert_eq!(intents.chart_type, ChartType::Pie);
}

#[test]
fn users_do_not_share_layouts() {
    let dir = tempdir().unwrap();
    let alice = JsonFilePersistence::for_user(dir.path(), "alice");
    let bob = JsonFilePersistence::for_user(dir.path(), "bob");
    {
        let mut dashboard = open(&alice);
        dashboard.remove_card("fallbackCounts").unwrap();
        dashboard.flush();
    }
    assert_eq!(open(&alice).cards().len(), 4);
    assert_eq!(open(&bob).cards().len(), 5);
    assert!(bob.load().unwrap().is_none());
}

#[test]
fn ids_differing_in_case_or_punctuation_do_not_share_layouts() {
    let dir = tempdir().unwrap();
    let upper = JsonFilePersistence::for_user(dir.path(), "Alice");
    let lower = JsonFilePersistence::for_user(dir.path(), "alice");
    let bangs = JsonFilePersistence::for_user(dir.path(), "!!!");
    let fallback = JsonFilePersistence::for_user(dir.path(), "default");
    assert_ne!(upper.path(), lower.path());
    assert_ne!(bangs.path(), fallback.path());
    {
        let mut dashboard = open(&upper);
        dashboard.remove_card("visitCounts").unwrap();
        dashboard.flush();
    }
    {
        let mut dashboard = open(&bangs);
        dashboard.swap_cards(0, 1).unwrap();
        dashboard.flush();
    }
    assert_eq!(open(&upper).cards().len(), 4);
    assert_eq!(open(&lower).cards().len(), 5);
    assert!(lower.load().unwrap().is_none());
    assert_eq!(open(&bangs).cards()[0].card_id, "intentFrequencies");
    assert_eq!(open(&fallback).cards()[0].card_id, "conversationLengths");
}

#[test]
fn one_unreadable_card_keeps_the_stored_order() {
    let dir = tempdir().unwrap();
    let persistence = JsonFilePersistence::for_user(dir.path(), "frank");
    std::fs::create_dir_all(persistence.path().parent().unwrap()).unwrap();
    std::fs::write(
        persistence.path(),
        r#"{"version": 1, "cards": [
            {"cardId": "visitCounts", "chartType": "line"},
            {"cardId": "conversationLengths", "chartType": "area"}
        ]}"#,
    )
    .unwrap();
    let mut dashboard = open(&persistence);
    let ids: Vec<_> = dashboard.cards().iter().map(|c| c.card_id.clone()).collect();
    assert_eq!(ids, ["visitCounts", "conversationLengths"]);
    assert_eq!(dashboard.warnings.len(), 1);
    assert_eq!(dashboard.cards()[1].settings.chart_type, ChartType::Bar);

    dashboard
        .set_card_setting("conversationLengths", "chartType", json!("pie"))
        .unwrap();
    dashboard.flush();
    let stored = persistence.load().unwrap().unwrap();
    let stored_ids: Vec<_> = stored.cards.iter().map(|c| c.card_id.as_str()).collect();
    assert_eq!(stored_ids, ["visitCounts", "conversationLengths"]);
    assert_eq!(stored.cards[1].chart_type, ChartType::Pie);
}

#[test]
fn orphaned_settings_dropped_on_load() {
    let dir = tempdir().unwrap();
    let persistence = JsonFilePersistence::for_user(dir.path(), "carol");
    std::fs::create_dir_all(persistence.path().parent().unwrap()).unwrap();
    std::fs::write(
        persistence.path(),
        r#"{"version": 1, "cards": [
            {"cardId": "visitCounts", "chartType": "line"},
            {"cardId": "retiredCard", "chartType": "bar"},
            {"cardId": "conversationLengths", "chartType": "pie"}
        ]}"#,
    )
    .unwrap();
    let dashboard = open(&persistence);
    let ids: Vec<_> = dashboard.cards().iter().map(|c| c.card_id.as_str()).collect();
    assert_eq!(ids, ["visitCounts", "conversationLengths"]);
    assert_eq!(dashboard.warnings.len(), 1);
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let persistence = JsonFilePersistence::for_user(dir.path(), "dave");
    std::fs::create_dir_all(persistence.path().parent().unwrap()).unwrap();
    std::fs::write(persistence.path(), "{not json").unwrap();
    let dashboard = open(&persistence);
    assert_eq!(dashboard.cards().len(), 5);
    assert!(!dashboard.warnings.is_empty());
}

#[test]
fn reset_removes_customisation() {
    let dir = tempdir().unwrap();
    let persistence = JsonFilePersistence::for_user(dir.path(), "erin");
    let mut dashboard = open(&persistence);
    dashboard.swap_cards(0, 1).unwrap();
    dashboard.reset_preferences();
    dashboard.flush();
    let stored = persistence.load().unwrap().unwrap();
    assert_eq!(stored.cards[0].card_id, "conversationLengths");
}
