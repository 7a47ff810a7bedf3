//! Convert and dump service tests.

use std::sync::Arc;

use chrono::NaiveDateTime;
use geoharvest_core::pipeline::{WATERMARK_FORMAT, conversion_watermark_key};
use geoharvest_core::{
    ConvertMode, ConvertService, Crosswalk, DumpMode, DumpService, RecordState, SourceConverter,
    SourceKind,
};
use serde_json::json;

use super::common::{MockPackageStore, MockRecordStore, MockWatermarkStore, raw_feed_record};

fn converter() -> SourceConverter {
    SourceConverter::for_source(
        Arc::new(Crosswalk::load().unwrap()),
        SourceKind::Geogratis,
    )
}

#[tokio::test]
async fn test_reader_invoked_ceil_pages_plus_one() {
    let records = MockRecordStore::new();
    for i in 0..25 {
        records.seed(raw_feed_record(&format!("rec-{i:02}"), RecordState::Active));
    }
    let packages = MockPackageStore::new();
    let service = ConvertService::new(records.clone(), packages.clone(), MockWatermarkStore::new())
        .with_page_size(10);

    let stats = service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();

    // 25 records at page size 10: three full reads plus the empty one.
    assert_eq!(records.find_batch_calls(), 4);
    assert_eq!(stats.published, 25);
    assert_eq!(packages.packages().len(), 25);
}

#[tokio::test]
async fn test_non_active_records_skipped() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    records.seed(raw_feed_record("b", RecordState::Deleted));
    records.seed(raw_feed_record("c", RecordState::MissingFrench));
    let packages = MockPackageStore::new();
    let service = ConvertService::new(records, packages.clone(), MockWatermarkStore::new());

    let stats = service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(packages.packages().len(), 1);
    assert_eq!(packages.packages()[0].uuid, "a");
}

#[tokio::test]
async fn test_converting_twice_is_idempotent() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    let packages = MockPackageStore::new();
    let watermarks = MockWatermarkStore::new();
    let service = ConvertService::new(records, packages.clone(), watermarks);

    service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();
    let first = packages.packages();
    assert_eq!(first.len(), 1);

    service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();
    let second = packages.packages();

    // Still exactly one row, byte-identical payload, original creation
    // timestamp preserved.
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].payload, first[0].payload);
    assert_eq!(second[0].created, first[0].created);
    assert_eq!(second[0].id, first[0].id);
}

#[tokio::test]
async fn test_rejected_record_produces_no_package() {
    let records = MockRecordStore::new();
    let mut record = raw_feed_record("a", RecordState::Active);
    let mut payload: serde_json::Value =
        serde_json::from_str(record.payload_en.as_deref().unwrap()).unwrap();
    payload["files"] = json!([]);
    record.payload_en = Some(payload.to_string());
    records.seed(record);

    let packages = MockPackageStore::new();
    let service = ConvertService::new(records, packages.clone(), MockWatermarkStore::new());
    let stats = service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.published, 0);
    assert!(packages.packages().is_empty());
}

#[tokio::test]
async fn test_run_writes_conversion_watermark() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    let watermarks = MockWatermarkStore::new();
    let service = ConvertService::new(records, MockPackageStore::new(), watermarks.clone());

    service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();

    let key = conversion_watermark_key(SourceKind::Geogratis);
    assert_eq!(key, "last_conversion_gr");
    let saved = watermarks.value(&key).unwrap();
    assert!(NaiveDateTime::parse_from_str(&saved, WATERMARK_FORMAT).is_ok());
}

#[tokio::test]
async fn test_published_payload_is_flat_package_json() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    let packages = MockPackageStore::new();
    let service = ConvertService::new(records, packages.clone(), MockWatermarkStore::new());
    service
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();

    let payload: serde_json::Value =
        serde_json::from_str(&packages.packages()[0].payload).unwrap();
    assert_eq!(payload["id"], "a");
    assert_eq!(payload["name"], "a");
    assert_eq!(payload["type"], "dataset");
    assert_eq!(payload["owner_org"], "nrcan-rncan");
    assert_eq!(payload["license_id"], "ca-ogl-lgo");
    assert_eq!(payload["ready_to_publish"], true);
    assert_eq!(payload["state"], "active");
    assert_eq!(payload["keywords"], "earth sciences,geology");
    assert_eq!(payload["resources"].as_array().unwrap().len(), 2);
    assert!(!payload["portal_release_date"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_dump_writes_one_line_per_package() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    records.seed(raw_feed_record("b", RecordState::Active));
    let packages = MockPackageStore::new();
    let watermarks = MockWatermarkStore::new();
    let convert = ConvertService::new(records, packages.clone(), watermarks.clone());
    convert
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();

    let dump = DumpService::new(packages, watermarks);
    let mut out = Vec::new();
    let written = dump
        .run(SourceKind::Geogratis, DumpMode::All, &mut out)
        .await
        .unwrap();
    assert_eq!(written, 2);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["type"], "dataset");
    }
}

#[tokio::test]
async fn test_dump_since_filters_by_updated() {
    let records = MockRecordStore::new();
    records.seed(raw_feed_record("a", RecordState::Active));
    let packages = MockPackageStore::new();
    let watermarks = MockWatermarkStore::new();
    let convert = ConvertService::new(records, packages.clone(), watermarks.clone());
    convert
        .run(&converter(), SourceKind::Geogratis, ConvertMode::All)
        .await
        .unwrap();

    let dump = DumpService::new(packages, watermarks);
    let mut out = Vec::new();
    let written = dump
        .run(
            SourceKind::Geogratis,
            DumpMode::Since("2999-01-01 00:00:00".to_string()),
            &mut out,
        )
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert!(out.is_empty());
}
