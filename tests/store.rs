use std::path::Path;

use assert_matches::assert_matches;

use aba_overview::domain::{EntityId, EntityKind, RecordType};
use aba_overview::error::OverviewError;
use aba_overview::store::{MemoryStore, MetadataStore, PropertyValue};

fn fixture() -> MemoryStore {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/lsm_snapshot.json");
    MemoryStore::from_snapshot(&path).unwrap()
}

#[test]
fn snapshot_loads_entities() {
    let store = fixture();
    assert_eq!(store.len(), 7);

    let records = store.find_records(&RecordType::lsm_scan()).unwrap();
    let ids: Vec<u64> = records.iter().map(|record| record.id.get()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn snapshot_values_keep_their_types() {
    let store = fixture();
    let records = store.find_records(&RecordType::lsm_scan()).unwrap();
    let first = &records[0];

    assert_eq!(first.number("delta_pixel_xy").unwrap(), 3.14159);
    assert_eq!(
        first.references("filters").unwrap(),
        vec![EntityId::new(101), EntityId::new(102)]
    );
    assert_eq!(first.scalar("additional_comments").unwrap(), &PropertyValue::from(""));
    assert_eq!(records[1].integer("number_of_channels").unwrap(), 1);
    assert_eq!(records[1].number("delta_pixel_z").unwrap(), 4.0);
}

#[test]
fn lookups_filter_by_kind() {
    let store = fixture();
    let sample = store
        .find_unique(EntityKind::Sample, EntityId::new(10))
        .unwrap();
    assert_eq!(sample.name.as_deref(), Some("ABA-0001"));

    assert_matches!(
        store.find_unique(EntityKind::Person, EntityId::new(10)),
        Err(OverviewError::ReferenceResolution { matches: 0, .. })
    );
}

#[test]
fn malformed_snapshot() {
    assert_matches!(
        MemoryStore::from_json(r#"{"entities": [{"name": "no id"}]}"#),
        Err(OverviewError::SnapshotParse(_))
    );
    assert_matches!(
        MemoryStore::from_snapshot(Path::new("/nonexistent/snapshot.json")),
        Err(OverviewError::SnapshotRead(_))
    );
}
