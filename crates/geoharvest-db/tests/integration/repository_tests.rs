//! Repository behavior against a real SQLite database.

use chrono::{Duration, Utc};
use geoharvest_core::model::{RecordState, SourceKind};
use geoharvest_core::traits::{RecordQuery, SaveOutcome, UpsertOutcome};
use geoharvest_db::{PackageRepository, RecordRepository, SettingsRepository};

use super::common::{sample_package, sample_record, setup_test_db};

#[tokio::test]
async fn test_save_inserts_then_replaces() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool);

    let mut record = sample_record("abc-123", RecordState::Active);
    let outcome = repo.save(&record).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Created);

    record.title_en = Some("Updated title".to_string());
    let outcome = repo.save(&record).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Replaced);

    let stored = repo
        .get(SourceKind::Geogratis, "abc-123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title_en.as_deref(), Some("Updated title"));
    assert_eq!(stored.state, RecordState::Active);
}

#[tokio::test]
async fn test_deleted_record_is_frozen() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool);

    let deleted = sample_record("gone-1", RecordState::Deleted);
    repo.save(&deleted).await.unwrap();

    // A later rescan sees the product again, but the deletion must stick.
    let mut revived = sample_record("gone-1", RecordState::Active);
    revived.title_en = Some("Should not land".to_string());
    let outcome = repo.save(&revived).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Frozen);

    let stored = repo
        .get(SourceKind::Geogratis, "gone-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, RecordState::Deleted);
    assert_ne!(stored.title_en.as_deref(), Some("Should not land"));
}

#[tokio::test]
async fn test_batch_pages_by_row_id() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool);

    for i in 0..5 {
        let record = sample_record(&format!("uuid-{i}"), RecordState::Active);
        repo.save(&record).await.unwrap();
    }

    let first = repo
        .batch(&RecordQuery {
            source: SourceKind::Geogratis,
            limit_id: 0,
            limit: 2,
            cutoff: None,
        })
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let cursor = first.last().unwrap().id;
    let second = repo
        .batch(&RecordQuery {
            source: SourceKind::Geogratis,
            limit_id: cursor,
            limit: 10,
            cutoff: None,
        })
        .await
        .unwrap();
    assert_eq!(second.len(), 3);
    assert!(second.iter().all(|r| r.id > cursor));
}

#[tokio::test]
async fn test_batch_honors_scan_cutoff() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool.clone());

    repo.save(&sample_record("old-1", RecordState::Active))
        .await
        .unwrap();
    repo.save(&sample_record("new-1", RecordState::Active))
        .await
        .unwrap();

    // Backdate the first row past the cutoff window.
    let old = Utc::now() - Duration::days(30);
    sqlx::query("UPDATE raw_records SET scanned_at = ? WHERE uuid = ?")
        .bind(old)
        .bind("old-1")
        .execute(&pool)
        .await
        .unwrap();

    let recent = repo
        .batch(&RecordQuery {
            source: SourceKind::Geogratis,
            limit_id: 0,
            limit: 10,
            cutoff: Some(Utc::now() - Duration::days(7)),
        })
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].uuid, "new-1");
}

#[tokio::test]
async fn test_batch_clamps_zero_limit() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool);

    repo.save(&sample_record("a", RecordState::Active))
        .await
        .unwrap();
    repo.save(&sample_record("b", RecordState::Active))
        .await
        .unwrap();

    let page = repo
        .batch(&RecordQuery {
            source: SourceKind::Geogratis,
            limit_id: 0,
            limit: 0,
            cutoff: None,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_batch_filters_by_source() {
    let pool = setup_test_db().await;
    let repo = RecordRepository::new(pool);

    let mut csw = sample_record("csw-1", RecordState::Active);
    csw.source = SourceKind::EcCsw;
    repo.save(&csw).await.unwrap();
    repo.save(&sample_record("gr-1", RecordState::Active))
        .await
        .unwrap();

    let page = repo
        .batch(&RecordQuery {
            source: SourceKind::EcCsw,
            limit_id: 0,
            limit: 10,
            cutoff: None,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].uuid, "csw-1");
}

#[tokio::test]
async fn test_upsert_preserves_creation_timestamp() {
    let pool = setup_test_db().await;
    let repo = PackageRepository::new(pool);

    let package = sample_package("pkg-1");
    let outcome = repo.upsert(&package).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Created);

    let first = repo
        .get(SourceKind::Geogratis, "pkg-1")
        .await
        .unwrap()
        .unwrap();

    let mut changed = sample_package("pkg-1");
    changed.payload = r#"{"id": "pkg-1", "type": "dataset", "state": "active"}"#.to_string();
    let outcome = repo.upsert(&changed).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let second = repo
        .get(SourceKind::Geogratis, "pkg-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.created, first.created);
    assert_eq!(second.payload, changed.payload);
}

#[tokio::test]
async fn test_list_batch_filters_by_updated_timestamp() {
    let pool = setup_test_db().await;
    let repo = PackageRepository::new(pool);

    repo.upsert(&sample_package("pkg-a")).await.unwrap();
    repo.upsert(&sample_package("pkg-b")).await.unwrap();

    let all = repo
        .batch(SourceKind::Geogratis, 0, 10, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let past = repo
        .batch(SourceKind::Geogratis, 0, 10, Some("2000-01-01 00:00:00"))
        .await
        .unwrap();
    assert_eq!(past.len(), 2);

    let future = repo
        .batch(SourceKind::Geogratis, 0, 10, Some("2999-01-01 00:00:00"))
        .await
        .unwrap();
    assert!(future.is_empty());
}

#[tokio::test]
async fn test_settings_round_trip_and_overwrite() {
    let pool = setup_test_db().await;
    let repo = SettingsRepository::new(pool);

    assert_eq!(repo.get("monitor_link").await.unwrap(), None);

    repo.set("monitor_link", "http://example.org/page-1")
        .await
        .unwrap();
    assert_eq!(
        repo.get("monitor_link").await.unwrap().as_deref(),
        Some("http://example.org/page-1")
    );

    repo.set("monitor_link", "http://example.org/page-9")
        .await
        .unwrap();
    assert_eq!(
        repo.get("monitor_link").await.unwrap().as_deref(),
        Some("http://example.org/page-9")
    );
}

#[tokio::test]
async fn test_setting_with_null_value_reads_as_absent() {
    let pool = setup_test_db().await;
    let repo = SettingsRepository::new(pool.clone());

    // The value column is nullable; a row can exist before any value is set.
    sqlx::query("INSERT INTO settings (setting_name, setting_value) VALUES (?, NULL)")
        .bind("csw_last_scan_date")
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(repo.get("csw_last_scan_date").await.unwrap(), None);
}
