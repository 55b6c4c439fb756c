// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed build tests against an in-memory store.
//!
//! These cover viewer scoping, ordering, idempotence and the partial-failure
//! policy of the whole pipeline.

use community_feed::db::SourceQuery;
use community_feed::error::AppError;
use community_feed::models::{ActivityKind, Visibility};
use community_feed::services::{FeedLimits, FeedMode, FeedService, FeedSource};

mod common;
use common::{event, exercise, learning_path, path_completion, route, ts, InMemoryStore, Op};

const VIEWER: &str = "viewer";

/// V follows {A, B}; A and C created routes, B created an event.
fn following_scenario() -> InMemoryStore {
    let mut store = InMemoryStore::new()
        .with_profiles(&[VIEWER, "A", "B", "C"])
        .follow(VIEWER, "A")
        .follow(VIEWER, "B");
    store.routes = vec![
        route("r-a", "A", 10, Visibility::Public),
        route("r-c", "C", 20, Visibility::Public),
    ];
    store.events = vec![event("e-b", "B", 5, Visibility::Public)];
    store
}

/// Every source populated, including a completed learning path.
fn busy_store() -> InMemoryStore {
    let mut store = InMemoryStore::new().with_profiles(&["A", "B", "C"]);
    store.routes = vec![
        route("r1", "A", 40, Visibility::Public),
        route("r2", "B", 15, Visibility::Unlisted),
        route("r3", "C", 33, Visibility::Public),
    ];
    store.events = vec![
        event("e1", "B", 25, Visibility::Public),
        event("e2", "C", 40, Visibility::Public),
    ];
    store.exercise_completions = vec![exercise("x1", "A", 12), exercise("x2", "C", 37)];
    store.path_completions = vec![
        path_completion("p1", "B", "e1", 20),
        path_completion("p1", "B", "e2", 30),
    ];
    store.learning_paths = vec![learning_path("p1", true)];
    store.path_exercise_counts.insert("p1".to_string(), 2);
    store
}

fn service(store: InMemoryStore) -> FeedService<InMemoryStore> {
    FeedService::new(store, FeedLimits::default())
}

#[tokio::test]
async fn test_following_mode_scopes_to_followed_users() {
    let service = service(following_scenario());

    let feed = service.build_feed(VIEWER, FeedMode::Following).await.unwrap();

    let ids: Vec<&str> = feed.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["route:r-a", "event:e-b"]);
    assert_eq!(feed.items[0].user.id, "A");
    assert_eq!(feed.items[0].created_at, ts(10));
    assert_eq!(feed.items[1].kind(), ActivityKind::EventCreated);
    assert_eq!(feed.items[1].created_at, ts(5));
    assert_eq!(feed.mode, FeedMode::Following);
}

#[tokio::test]
async fn test_all_mode_returns_everyone_newest_first() {
    let service = service(following_scenario());

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    let times: Vec<_> = feed.items.iter().map(|i| i.created_at).collect();
    assert_eq!(times, vec![ts(20), ts(10), ts(5)]);
    assert_eq!(feed.items[0].id, "route:r-c");
}

#[tokio::test]
async fn test_following_filter_is_pushed_down() {
    let service = service(following_scenario());

    service.build_feed(VIEWER, FeedMode::Following).await.unwrap();

    let followed = vec!["A".to_string(), "B".to_string()];
    let mut queries = service.store().queries();
    queries.sort_by_key(|(op, _)| format!("{:?}", op));
    assert_eq!(
        queries,
        vec![
            (Op::Events, SourceQuery::actors(followed.clone(), 30)),
            (Op::ExerciseCompletions, SourceQuery::actors(followed.clone(), 50)),
            (Op::PathCompletions, SourceQuery::actors(followed.clone(), 100)),
            (Op::Routes, SourceQuery::actors(followed, 30)),
        ]
    );
}

#[tokio::test]
async fn test_empty_follow_set_yields_empty_feed() {
    let mut store = following_scenario();
    store.follows.clear();
    let service = service(store);

    let feed = service.build_feed(VIEWER, FeedMode::Following).await.unwrap();

    assert!(feed.items.is_empty(), "public activity must not leak in");
    assert!(feed.failed_sources.is_empty());
    assert!(service.store().queries().is_empty(), "no source should be queried");
}

#[tokio::test]
async fn test_follow_lookup_failure_fails_closed() {
    let service = service(following_scenario());
    service.store().set_failing(&[Op::Following]);

    let feed = service.build_feed(VIEWER, FeedMode::Following).await.unwrap();

    assert!(feed.items.is_empty());
    assert!(feed.failed_sources.is_empty());
}

#[tokio::test]
async fn test_private_records_are_excluded() {
    let mut store = following_scenario();
    store.routes.push(route("r-private", "A", 50, Visibility::Private));
    store.events.push(event("e-private", "B", 60, Visibility::Private));
    let service = service(store);

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    assert!(feed.items.iter().all(|i| !i.id.contains("private")));
    assert_eq!(feed.items.len(), 3);
}

#[tokio::test]
async fn test_unresolvable_users_are_dropped() {
    let mut store = following_scenario();
    store.routes.push(route("r-ghost", "deleted-account", 99, Visibility::Public));
    let service = service(store);

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    assert!(feed.items.iter().all(|i| i.id != "route:r-ghost"));
    assert_eq!(feed.items.len(), 3);
}

#[tokio::test]
async fn test_sort_invariant_holds() {
    let service = service(busy_store());

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    assert_eq!(feed.items.len(), 8);
    for pair in feed.items.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "{} ({}) before {} ({})",
            pair[0].id,
            pair[0].created_at,
            pair[1].id,
            pair[1].created_at
        );
    }
}

#[tokio::test]
async fn test_identical_timestamps_use_kind_then_id() {
    let service = service(busy_store());

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    // r1 and e2 share t=40
    assert_eq!(feed.items[0].id, "route:r1");
    assert_eq!(feed.items[1].id, "event:e2");
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let service = service(busy_store());

    let first = service.build_feed(VIEWER, FeedMode::All).await.unwrap();
    let second = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    assert_eq!(first, second);
    assert!(first
        .items
        .iter()
        .any(|i| i.id == "path-completed:p1:B"));
}

#[tokio::test]
async fn test_one_failed_source_leaves_others_intact() {
    let baseline = service(busy_store())
        .build_feed(VIEWER, FeedMode::All)
        .await
        .unwrap();

    for (op, source, kind) in [
        (Op::Routes, FeedSource::Routes, ActivityKind::RouteCreated),
        (Op::Events, FeedSource::Events, ActivityKind::EventCreated),
        (
            Op::ExerciseCompletions,
            FeedSource::ExerciseCompletions,
            ActivityKind::ExerciseCompleted,
        ),
        (
            Op::PathCompletions,
            FeedSource::PathCompletions,
            ActivityKind::LearningPathCompleted,
        ),
    ] {
        let service = service(busy_store());
        service.store().set_failing(&[op]);

        let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

        let expected: Vec<_> = baseline
            .items
            .iter()
            .filter(|i| i.kind() != kind)
            .cloned()
            .collect();
        assert_eq!(feed.items, expected, "failing {:?}", op);
        assert_eq!(feed.failed_sources, vec![source]);
        assert!(feed.is_partial());
    }
}

#[tokio::test]
async fn test_all_sources_failing_is_an_error() {
    let service = service(busy_store());
    service.store().set_failing(&[
        Op::Routes,
        Op::Events,
        Op::ExerciseCompletions,
        Op::PathCompletions,
    ]);

    let result = service.build_feed(VIEWER, FeedMode::All).await;

    assert!(matches!(result, Err(AppError::FeedUnavailable(4))));
}

#[tokio::test]
async fn test_empty_store_is_empty_not_error() {
    let service = service(InMemoryStore::new());

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    assert!(feed.items.is_empty());
    assert!(!feed.is_partial());
}

#[tokio::test]
async fn test_per_source_limits_truncate_before_merge() {
    let mut store = busy_store();
    store.routes = (0..5)
        .map(|i| route(&format!("r{}", i), "A", 100 + i, Visibility::Public))
        .collect();
    let limits = FeedLimits {
        routes: 2,
        ..FeedLimits::default()
    };
    let service = FeedService::new(store, limits);

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    let routes: Vec<&str> = feed
        .items
        .iter()
        .filter(|i| i.kind() == ActivityKind::RouteCreated)
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(routes, vec!["route:r4", "route:r3"]);
}

#[tokio::test]
async fn test_path_completion_and_exercises_both_present() {
    let mut store = busy_store();
    store.exercise_completions.push(exercise("x-b", "B", 30));
    let service = service(store);

    let feed = service.build_feed(VIEWER, FeedMode::All).await.unwrap();

    let at_30: Vec<ActivityKind> = feed
        .items
        .iter()
        .filter(|i| i.created_at == ts(30))
        .map(|i| i.kind())
        .collect();
    assert_eq!(
        at_30,
        vec![
            ActivityKind::ExerciseCompleted,
            ActivityKind::LearningPathCompleted
        ]
    );
}
