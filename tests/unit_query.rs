// Query behavior over an in-memory SQLite store.
//
// Each test seeds a small fixed set of hotspots and checks that the query
// service returns exactly what the criteria describe.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

use geih::db::models::Hotspot;
use geih::db::{open_sqlite_in_memory, Database};
use geih::query::{BoundingBox, HotspotQueryService, QueryCriteria};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn fixtures() -> Vec<Hotspot> {
    vec![
        Hotspot::new(-3.10, -60.02, at(1, 0, 0), 90, "VIIRS")
            .with_id("HS_A")
            .with_biome("Amazonia")
            .with_brightness(340.1)
            .with_frp(22.5),
        Hotspot::new(-9.50, -56.80, at(15, 14, 30), 55, "MODIS")
            .with_id("HS_B")
            .with_biome("Cerrado"),
        Hotspot::new(-15.60, -47.90, at(31, 23, 59), 30, "VIIRS")
            .with_id("HS_C")
            .with_biome("Cerrado")
            .with_land_use("pasture"),
        Hotspot::new(4.80, -74.10, at(20, 6, 0), 70, "VIIRS").with_id("HS_D"),
    ]
}

async fn seeded() -> (Arc<dyn Database>, HotspotQueryService) {
    let db = open_sqlite_in_memory().unwrap();
    db.save_batch(&fixtures()).await.unwrap();
    let service = HotspotQueryService::new(db.clone());
    (db, service)
}

fn ids(hotspots: &[Hotspot]) -> Vec<String> {
    let mut ids: Vec<String> = hotspots.iter().filter_map(|h| h.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn empty_criteria_returns_everything() {
    let (_db, service) = seeded().await;
    let all = service.execute(&QueryCriteria::default()).await.unwrap();
    assert_eq!(ids(&all), vec!["HS_A", "HS_B", "HS_C", "HS_D"]);
}

#[tokio::test]
async fn empty_store_returns_empty_list() {
    let db = open_sqlite_in_memory().unwrap();
    let service = HotspotQueryService::new(db);
    let criteria = QueryCriteria {
        min_confidence: Some(50),
        ..Default::default()
    };
    assert!(service.execute(&criteria).await.unwrap().is_empty());
}

#[tokio::test]
async fn date_bounds_are_inclusive() {
    let (_db, service) = seeded().await;
    let criteria = QueryCriteria {
        start_date: Some(at(1, 0, 0)),
        end_date: Some(at(15, 14, 30)),
        ..Default::default()
    };
    let found = service.execute(&criteria).await.unwrap();
    assert_eq!(ids(&found), vec!["HS_A", "HS_B"]);
}

#[tokio::test]
async fn date_only_end_means_midnight() {
    let (_db, service) = seeded().await;
    let criteria = QueryCriteria {
        end_date: Some(at(31, 0, 0)),
        ..Default::default()
    };
    let found = service.execute(&criteria).await.unwrap();
    // HS_C at 23:59 on the 31st falls after midnight.
    assert_eq!(ids(&found), vec!["HS_A", "HS_B", "HS_D"]);
}

#[tokio::test]
async fn min_confidence_is_inclusive() {
    let (_db, service) = seeded().await;
    let criteria = QueryCriteria {
        min_confidence: Some(70),
        ..Default::default()
    };
    let found = service.execute(&criteria).await.unwrap();
    assert_eq!(ids(&found), vec!["HS_A", "HS_D"]);
}

#[tokio::test]
async fn source_and_biome_are_exact_matches() {
    let (_db, service) = seeded().await;

    let criteria = QueryCriteria {
        source: Some("VIIRS".into()),
        biome: Some("Cerrado".into()),
        ..Default::default()
    };
    assert_eq!(ids(&service.execute(&criteria).await.unwrap()), vec!["HS_C"]);

    let criteria = QueryCriteria {
        source: Some("viirs".into()),
        ..Default::default()
    };
    assert!(service.execute(&criteria).await.unwrap().is_empty());
}

#[tokio::test]
async fn bounding_box_edges_are_inclusive() {
    let (_db, service) = seeded().await;
    let criteria = QueryCriteria {
        bounding_box: Some(BoundingBox::new(-60.02, -9.50, -56.80, -3.10)),
        ..Default::default()
    };
    let found = service.execute(&criteria).await.unwrap();
    assert_eq!(ids(&found), vec!["HS_A", "HS_B"]);
}

#[tokio::test]
async fn partial_bounding_box_is_no_filter() {
    let (_db, service) = seeded().await;
    let bbox = BoundingBox::from_parts(Some(-61.0), Some(-10.0), None, Some(0.0));
    assert!(bbox.is_none());

    let criteria = QueryCriteria {
        bounding_box: bbox,
        ..Default::default()
    };
    assert_eq!(service.execute(&criteria).await.unwrap().len(), 4);
}

#[tokio::test]
async fn store_results_agree_with_in_memory_predicates() {
    let (_db, service) = seeded().await;
    let criteria = QueryCriteria {
        start_date: Some(at(10, 0, 0)),
        min_confidence: Some(40),
        source: Some("VIIRS".into()),
        bounding_box: Some(BoundingBox::new(-80.0, -20.0, -40.0, 10.0)),
        ..Default::default()
    };

    let from_store = service.execute(&criteria).await.unwrap();
    let expected: Vec<Hotspot> = fixtures()
        .into_iter()
        .filter(|h| criteria.matches(h))
        .collect();
    assert_eq!(ids(&from_store), ids(&expected));
    assert_eq!(ids(&from_store), vec!["HS_D"]);
}

#[tokio::test]
async fn save_then_find_round_trips_required_fields() {
    let db = open_sqlite_in_memory().unwrap();
    let service = HotspotQueryService::new(db.clone());

    let original = Hotspot::new(-7.25, -63.5, at(12, 9, 45), 77, "VIIRS")
        .with_brightness(331.7)
        .with_frp(4.2)
        .with_biome("Amazonia");
    let saved = db.save(&original).await.unwrap();

    assert!(saved.id.as_deref().is_some_and(|id| id.starts_with("HS_")));
    assert!(saved.created_at.is_some());
    assert!(saved.updated_at.is_some());
    assert!(saved.same_detection(&original));

    let found = service.execute(&QueryCriteria::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, saved.id);
    assert!(found[0].same_detection(&original));
}

#[tokio::test]
async fn saving_same_id_replaces() {
    let db = open_sqlite_in_memory().unwrap();
    let first = Hotspot::new(-3.0, -60.0, at(2, 12, 0), 40, "VIIRS").with_id("HS_X");
    let created = db.save(&first).await.unwrap();

    let mut second = first.clone();
    second.confidence = 95;
    let updated = db.save(&second).await.unwrap();

    assert_eq!(db.count_hotspots().await.unwrap(), 1);
    assert_eq!(updated.confidence, 95);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn counts_by_source() {
    let (db, _service) = seeded().await;
    let counts = db.count_by_source().await.unwrap();
    assert_eq!(
        counts,
        vec![("VIIRS".to_string(), 3), ("MODIS".to_string(), 1)]
    );
}
