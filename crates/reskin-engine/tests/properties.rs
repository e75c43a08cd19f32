//! Properties of ordering, reconciliation and schedule migration over random inputs

use proptest::prelude::*;
use reskin_dom::{CardSpec, PageBuilder, PageLayout};
use reskin_engine::reconcile::{reconcile, PassInput};
use reskin_engine::schedule::{migrate, ScheduleBook, CURRENT_SCHEMA_VERSION};
use reskin_engine::{EngineConfig, FavoritesSet, ViewMode, ViewPreferences};
use serde_json::{json, Map, Value};

fn view_mode() -> impl Strategy<Value = ViewMode> {
    prop_oneof![
        Just(ViewMode::Grid),
        Just(ViewMode::List),
        Just(ViewMode::Original),
        Just(ViewMode::Carousel),
    ]
}

fn day() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "holiday",
    ])
}

fn time() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["", "08:30", "9:00", "10:00:00", "14:15", "25:00", "noon"])
}

fn session() -> impl Strategy<Value = Value> {
    (day(), time(), time()).prop_map(|(day, start, end)| json!({ "day": day, "startTime": start, "endTime": end }))
}

/// One course in any of the stored shapes
fn legacy_course() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(day(), 0..4).prop_map(|days| json!(days)),
        prop::collection::vec(day(), 0..4).prop_map(|days| json!({ "name": "Legacy", "days": days })),
        prop::collection::vec(session(), 0..4)
            .prop_map(|sessions| json!({ "name": "Current", "url": "#", "sessions": sessions })),
        Just(json!("garbage")),
    ]
}

fn stored_schedules() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[1-9][0-9]{0,2}", legacy_course(), 0..6)
        .prop_map(|courses| Value::Object(courses.into_iter().collect::<Map<String, Value>>()))
}

proptest! {
    #[test]
    fn toggling_twice_restores_the_set(ids in prop::collection::btree_set("[0-9]{1,3}", 0..8), id in "[0-9]{1,3}") {
        let mut set: FavoritesSet = ids.iter().map(String::as_str).collect();
        let before = set.clone();
        let on = set.toggle(&id);
        prop_assert_eq!(on, !before.contains(&id));
        prop_assert_eq!(set.toggle(&id), !on);
        prop_assert_eq!(set, before);
    }

    #[test]
    fn reconcile_orders_favorites_first_and_settles(
        n in 1..10usize,
        favs in prop::collection::btree_set(0..10usize, 0..5),
        mode in view_mode(),
    ) {
        let mut page = PageBuilder::new(PageLayout::Frontpage)
            .cards((0..n).map(|i| CardSpec::new(i.to_string(), format!("Course {i}"))))
            .build()
            .unwrap();
        let config = EngineConfig::default();
        let contract = config.host.compile().unwrap();
        let favorites: FavoritesSet = favs.iter().map(ToString::to_string).collect();
        let prefs = ViewPreferences { view_mode: mode, ..ViewPreferences::default() };
        let schedules = ScheduleBook::new();
        let input = PassInput {
            contract: &contract,
            favorites: &favorites,
            prefs: &prefs,
            schedules: &schedules,
            schedule_visible: false,
            placeholder_url: &config.placeholder_url,
            url: &page.url,
        };

        let first = reconcile(&mut page.doc, &input).unwrap();
        prop_assert_eq!(first.cards, n);
        page.doc.take_records();
        reconcile(&mut page.doc, &input).unwrap();
        prop_assert!(page.doc.pending_records().is_empty());

        if mode != ViewMode::Carousel {
            let container = page.container.unwrap();
            let ids: Vec<usize> = page.doc.children(container)
                .iter()
                .filter_map(|&c| contract.course_id(&page.doc, c))
                .map(|id| id.parse().unwrap())
                .collect();
            let expected: Vec<usize> = (0..n).filter(|i| favs.contains(i))
                .chain((0..n).filter(|i| !favs.contains(i)))
                .collect();
            prop_assert_eq!(ids, expected);
        }
    }

    #[test]
    fn migration_is_idempotent(raw in stored_schedules(), version in 0..=CURRENT_SCHEMA_VERSION) {
        let first = migrate(&raw, version);
        for (_, entry) in first.book.iter() {
            prop_assert!(!entry.sessions.is_empty());
        }

        let stored = serde_json::to_value(&first.book).unwrap();
        let again = migrate(&stored, CURRENT_SCHEMA_VERSION);
        prop_assert!(!again.changed);
        prop_assert!(!again.needs_persist);
        prop_assert_eq!(again.book, first.book);
    }
}
