mod common;

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use common::Fixture;
use searoute_lib::repository::HistoryRepository;
use searoute_lib::{
    AuditEvent, Error, HistoryQuery, Page, PageRequest, RouteHistory, RouteHistorySource,
    RouteHistoryStatus, RouteRequest, RouteService,
};

fn search(fixture: &Fixture, query: HistoryQuery, page: PageRequest) -> Page<RouteHistory> {
    fixture
        .history
        .find_history(&query, page)
        .expect("history query")
}

#[test]
fn calculation_with_user_is_persisted() {
    let fixture = Fixture::via_honolulu();
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama")).with_history(
        fixture
            .user()
            .source(RouteHistorySource::Auto)
            .route("voyage-7")
            .metadata("vessel", "Pacific Star"),
    );

    fixture
        .service
        .calculate_optimal_route(&request)
        .expect("route exists");

    let page = search(&fixture, HistoryQuery::default(), PageRequest::default());
    assert_eq!(page.total, 1);
    let entry = &page.items[0];
    assert_eq!(entry.user_id.as_deref(), Some("ana"));
    assert_eq!(entry.tenant_id.as_deref(), Some("acme"));
    assert_eq!(entry.route_id.as_deref(), Some("voyage-7"));
    assert_eq!(entry.source, RouteHistorySource::Auto);
    assert_eq!(entry.status, RouteHistoryStatus::Success);
    assert_eq!(entry.engine_version.as_deref(), Some("test-engine"));
    assert_eq!(entry.origin_port_name.as_deref(), Some("Callao"));
    assert_eq!(entry.destination_port_name.as_deref(), Some("Yokohama"));
    assert_eq!(entry.waypoint_port_ids, vec![fixture.id("Honolulu")]);
    assert!(entry.avoided_port_ids.is_empty());
    assert_eq!(entry.total_distance_km, Some(16340.0));
    assert_eq!(entry.metadata["portCount"], 3);
    assert_eq!(entry.metadata["vessel"], "Pacific Star");
    assert!(entry.metadata.contains_key("schemaVersion"));
    assert!(!entry.archived);
    assert_eq!(entry.dedup_hash.len(), 64);
}

#[test]
fn calculation_without_user_is_not_persisted() {
    let fixture = Fixture::via_honolulu();
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"));
    fixture
        .service
        .calculate_optimal_route(&request)
        .expect("route exists");

    let page = search(&fixture, HistoryQuery::default(), PageRequest::default());
    assert_eq!(page.total, 0);
}

#[test]
fn avoided_ports_and_disabled_ports_are_recorded_together() {
    let fixture = Fixture::with_alternate();
    fixture.disable("Honolulu");
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Pago Pago"))
        .avoiding([fixture.id("Yokohama")])
        .with_history(fixture.user());

    fixture
        .service
        .calculate_optimal_route(&request)
        .expect("direct lane");

    let page = search(&fixture, HistoryQuery::default(), PageRequest::default());
    let mut avoided = vec![fixture.id("Honolulu"), fixture.id("Yokohama")];
    avoided.sort_unstable();
    assert_eq!(page.items[0].avoided_port_ids, avoided);
    assert_eq!(page.items[0].metadata["avoidedPortCount"], 2);
}

#[test]
fn repeated_requests_within_a_minute_share_a_fingerprint() {
    let fixture = Fixture::via_honolulu();
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"))
        .with_history(fixture.user());

    fixture.service.calculate_optimal_route(&request).unwrap();
    fixture.clock.advance(Duration::seconds(20));
    fixture.service.calculate_optimal_route(&request).unwrap();
    fixture.clock.advance(Duration::minutes(5));
    fixture.service.calculate_optimal_route(&request).unwrap();

    let page = search(&fixture, HistoryQuery::default(), PageRequest::default());
    assert_eq!(page.total, 3);
    // Newest first.
    assert_ne!(page.items[0].dedup_hash, page.items[1].dedup_hash);
    assert_eq!(page.items[1].dedup_hash, page.items[2].dedup_hash);
}

#[test]
fn history_pages_newest_first_and_filters() {
    let fixture = Fixture::with_alternate();
    let pairs = [
        ("Callao", "Yokohama"),
        ("Callao", "Honolulu"),
        ("Honolulu", "Yokohama"),
        ("Pago Pago", "Callao"),
        ("Yokohama", "Callao"),
    ];
    for (from, to) in pairs {
        let request =
            RouteRequest::new(fixture.id(from), fixture.id(to)).with_history(fixture.user());
        fixture.service.calculate_optimal_route(&request).unwrap();
        fixture.clock.advance(Duration::minutes(1));
    }
    let other = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"))
        .with_history(searoute_lib::HistoryContext::for_user("ben"));
    fixture.service.calculate_optimal_route(&other).unwrap();

    let query = HistoryQuery {
        user_id: Some("ana".to_string()),
        ..HistoryQuery::default()
    };
    let first = search(&fixture, query.clone(), PageRequest::new(0, 2));
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].origin_port_name.as_deref(), Some("Yokohama"));

    let last = search(&fixture, query, PageRequest::new(2, 2));
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].origin_port_name.as_deref(), Some("Callao"));
    assert_eq!(last.items[0].destination_port_name.as_deref(), Some("Yokohama"));

    let window = HistoryQuery {
        from: Some(first.items[1].computed_at),
        to: Some(first.items[0].computed_at),
        user_id: Some("ana".to_string()),
        ..HistoryQuery::default()
    };
    assert_eq!(search(&fixture, window, PageRequest::default()).total, 2);
}

#[test]
fn archive_is_idempotent_and_filters() {
    let fixture = Fixture::via_honolulu();
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"))
        .with_history(fixture.user());
    fixture.service.calculate_optimal_route(&request).unwrap();
    let id = search(&fixture, HistoryQuery::default(), PageRequest::default()).items[0]
        .id
        .expect("stored id");

    let archived = fixture
        .history
        .archive(id, Some("superseded"), Some("ana"))
        .expect("archive");
    assert!(archived.archived);
    assert_eq!(archived.notes.as_deref(), Some("superseded"));

    let again = fixture
        .history
        .archive(id, Some("ignored"), Some("ana"))
        .expect("archive again");
    assert_eq!(again.notes.as_deref(), Some("superseded"));

    let archive_events = fixture
        .audit
        .events()
        .into_iter()
        .filter(|event| matches!(event, AuditEvent::HistoryArchived { .. }))
        .count();
    assert_eq!(archive_events, 1);

    let active = HistoryQuery {
        archived: Some(false),
        ..HistoryQuery::default()
    };
    assert_eq!(search(&fixture, active, PageRequest::default()).total, 0);

    let stored = fixture.store.find_by_id(id).unwrap().expect("entry exists");
    assert!(stored.archived);
}

#[test]
fn archiving_unknown_entry_fails() {
    let fixture = Fixture::pacific();
    let err = fixture.history.archive(404, None, None).unwrap_err();
    assert!(matches!(err, Error::HistoryNotFound { id: 404 }));
}

/// A history repository that refuses every write.
struct BrokenHistory;

impl HistoryRepository for BrokenHistory {
    fn insert(&self, _entry: &RouteHistory) -> searoute_lib::Result<i64> {
        Err(Error::CorruptRecord {
            table: "route_history",
            message: "disk full".to_string(),
        })
    }

    fn find_by_id(&self, _id: i64) -> searoute_lib::Result<Option<RouteHistory>> {
        Ok(None)
    }

    fn update(&self, _entry: &RouteHistory) -> searoute_lib::Result<()> {
        Ok(())
    }

    fn search(
        &self,
        _query: &HistoryQuery,
        page: PageRequest,
    ) -> searoute_lib::Result<Page<RouteHistory>> {
        Ok(Page {
            items: Vec::new(),
            page: page.page,
            size: page.size,
            total: 0,
        })
    }
}

#[test]
fn history_failures_do_not_fail_the_calculation() {
    let fixture = Fixture::via_honolulu();
    let broken = Arc::new(searoute_lib::RouteHistoryService::new(
        Arc::new(BrokenHistory),
        fixture.clock.clone(),
        fixture.audit.clone(),
    ));
    let service = RouteService::new(fixture.store.clone(), fixture.store.clone()).with_history(broken);

    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"))
        .with_history(fixture.user());
    let route = service.calculate_optimal_route(&request).expect("route");
    assert_eq!(route.path.len(), 3);
}

#[test]
fn calculations_count_towards_popularity() {
    let fixture = Fixture::with_alternate();
    let callao = fixture.id("Callao");
    let yokohama = fixture.id("Yokohama");
    let honolulu = fixture.id("Honolulu");

    for _ in 0..3 {
        fixture
            .service
            .calculate_optimal_route(&RouteRequest::new(callao, yokohama))
            .unwrap();
    }
    fixture.clock.advance(Duration::minutes(1));
    fixture
        .service
        .calculate_optimal_route(&RouteRequest::new(honolulu, yokohama))
        .unwrap();
    fixture.clock.advance(Duration::minutes(1));
    // Reverse direction is a separate pair.
    fixture
        .service
        .calculate_optimal_route(&RouteRequest::new(yokohama, callao))
        .unwrap();

    let top = fixture.popularity.top_routes(10).unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].origin_port_name, "Callao");
    assert_eq!(top[0].destination_port_name, "Yokohama");
    assert_eq!(top[0].searches_count, 3);
    assert_eq!(top[1].searches_count, 1);
    assert_eq!(top[1].origin_port_name, "Yokohama");

    assert_eq!(fixture.popularity.top_routes(1).unwrap().len(), 1);
    assert!(fixture.popularity.top_routes(0).unwrap().is_empty());
}

#[test]
fn concurrent_searches_of_one_pair_are_all_counted() {
    let fixture = Fixture::pacific();
    let origin = fixture.registry.get(fixture.id("Callao")).unwrap();
    let destination = fixture.registry.get(fixture.id("Yokohama")).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let tracker = Arc::clone(&fixture.popularity);
            let (origin, destination) = (origin.clone(), destination.clone());
            thread::spawn(move || {
                for _ in 0..200 {
                    tracker
                        .register_search(&origin, &destination, None)
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let top = fixture.popularity.top_routes(1).unwrap();
    assert_eq!(top[0].searches_count, 1600);
}

#[test]
fn failed_calculations_are_not_counted() {
    let fixture = Fixture::pacific();
    let request = RouteRequest::new(fixture.id("Callao"), fixture.id("Yokohama"));
    assert!(fixture.service.calculate_optimal_route(&request).is_err());
    assert!(fixture.popularity.top_routes(10).unwrap().is_empty());
}
