//! Calendar events through the engine: editing, persistence and the day view

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use reskin_engine::fetch::{ScanResult, SubmissionStatus};
use reskin_engine::keys::CustomEvents;
use reskin_engine::prompt::CONFIRM_DELETE_EVENT;
use reskin_engine::{CalendarError, DayEvent, Engine, EngineError, EventDraft};
use reskin_test_utils::{clock_at, fast_config, record, scanned, start_engine, tiered_store, tiered_store_with, ScriptedPrompt, T0};
use serde_json::json;

const HOUR_MS: i64 = 3_600_000;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn titles(events: &[DayEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| match e {
            DayEvent::Assignment { assignment, .. } => assignment.assignment_id.clone(),
            DayEvent::Custom(event) => event.title.clone(),
        })
        .collect()
}

#[tokio::test]
async fn events_are_edited_and_persisted() {
    let tiers = tiered_store();
    let prompt = ScriptedPrompt::confirming(&[false, true]);
    let engine = start_engine(tiers.store.clone(), clock_at(T0), prompt.clone()).await;

    let exam = engine
        .add_custom_event(&EventDraft::new("Exam", "2023-11-20").with_description("hall B"))
        .await
        .unwrap();
    let lab = engine.add_custom_event(&EventDraft::new("Lab", "2023-11-21")).await.unwrap();
    assert_eq!(exam.id, T0.to_string());
    assert_eq!(lab.id, (T0 + 1).to_string());

    engine
        .edit_custom_event(&exam.id, &EventDraft::new("Exam (moved)", "2023-11-22"))
        .await
        .unwrap();

    // another context sees the stored list
    let stored = tiers.store.another_context().load::<CustomEvents>().await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].title, "Exam (moved)");
    assert_eq!(stored[0].date, day("2023-11-22"));
    assert!(stored[0].description.is_empty());

    assert!(!engine.delete_custom_event(&lab.id).await.unwrap());
    assert_eq!(engine.custom_events().await.len(), 2);
    assert!(engine.delete_custom_event(&lab.id).await.unwrap());
    assert_eq!(engine.custom_events().await, vec![stored[0].clone()]);
    assert_eq!(prompt.asked(), vec![CONFIRM_DELETE_EVENT, CONFIRM_DELETE_EVENT]);
}

#[tokio::test]
async fn invalid_event_input_is_rejected() {
    let tiers = tiered_store();
    let engine = start_engine(tiers.store.clone(), clock_at(T0), ScriptedPrompt::new()).await;

    let err = engine.add_custom_event(&EventDraft::new("", "2023-11-20")).await.unwrap_err();
    assert!(matches!(err, EngineError::Calendar(CalendarError::MissingTitle)));
    let err = engine.add_custom_event(&EventDraft::new("Exam", "tomorrow")).await.unwrap_err();
    assert!(matches!(err, EngineError::Calendar(CalendarError::InvalidDate(_))));
    let err = engine.delete_custom_event("404").await.unwrap_err();
    assert!(matches!(err, EngineError::Calendar(CalendarError::UnknownEvent(_))));

    assert_eq!(tiers.local.peek("customEvents"), None);
}

#[tokio::test]
async fn day_view_merges_cached_assignments_and_events() {
    // T0 is 2023-11-14 22:13 UTC
    let scan = ScanResult {
        assignments: vec![scanned("1", "a1"), scanned("1", "a2"), scanned("2", "a3")],
        courses: Vec::new(),
    };
    let tiers = tiered_store_with(record(json!({
        "assignmentsCache": serde_json::to_value(&scan).unwrap(),
        "dueDateCache": { "a1": T0 - HOUR_MS, "a2": T0 + 3 * HOUR_MS, "a3": null },
        "submissionStatusCache": {
            "submission_status_a1": { "status": "submitted", "timestamp": T0 }
        }
    })));
    let engine = start_engine(tiers.store.clone(), clock_at(T0), ScriptedPrompt::new()).await;
    engine.add_custom_event(&EventDraft::new("Office hours", "2023-11-14")).await.unwrap();

    assert_eq!(engine.today(), day("2023-11-14"));
    let today = engine.today_events().await;
    assert_eq!(titles(&today), ["a1", "Office hours"]);
    assert!(matches!(
        &today[0],
        DayEvent::Assignment { status: Some(SubmissionStatus::Submitted), due_date_epoch, .. }
            if *due_date_epoch == T0 - HOUR_MS
    ));

    let tomorrow = engine.day_events(day("2023-11-15")).await;
    assert_eq!(titles(&tomorrow), ["a2"]);
    assert!(matches!(&tomorrow[0], DayEvent::Assignment { status: None, .. }));
}

#[tokio::test]
async fn day_boundaries_follow_the_configured_offset() {
    let scan = ScanResult {
        assignments: vec![scanned("1", "a2"), scanned("1", "a1")],
        courses: Vec::new(),
    };
    let tiers = tiered_store_with(record(json!({
        "assignmentsCache": serde_json::to_value(&scan).unwrap(),
        "dueDateCache": { "a1": T0 - HOUR_MS, "a2": T0 + 3 * HOUR_MS }
    })));
    let engine = Engine::start(
        fast_config().with_utc_offset_minutes(180),
        tiers.store.clone(),
        clock_at(T0),
        ScriptedPrompt::new(),
    )
    .await
    .unwrap();

    assert_eq!(engine.today(), day("2023-11-15"));
    assert_eq!(titles(&engine.today_events().await), ["a1", "a2"]);
    assert!(engine.day_events(day("2023-11-14")).await.is_empty());
}
