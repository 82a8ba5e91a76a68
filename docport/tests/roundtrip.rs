use docport::{
    DocumentReader, DocumentWriter, Error, Locator, Record, migrate, migrate_with_progress,
    open_expanded_writer, open_reader, open_writer,
};
use serde_json::{Value, json};
use tempfile::tempdir;

fn record(id: &str, value: Value) -> Record {
    let Value::Object(map) = value else {
        panic!("expected object")
    };
    Record::new(id, map)
}

fn locator(s: impl AsRef<str>) -> Locator {
    s.as_ref().parse().unwrap()
}

fn seed(destination: &Locator) {
    let mut writer = open_writer(destination).unwrap();
    writer
        .write(&record("beer-1", json!({"name": "pale", "abv": 5.2})))
        .unwrap();
    writer
        .write(&record("beer-2", json!({"name": "stout", "tags": ["dark"]})))
        .unwrap();
    writer
        .write(&record(
            "_design/views",
            json!({"views": {"all": {"map": "emit"}}}),
        ))
        .unwrap();
    writer.finish().unwrap();
}

fn read_back(source: &Locator) -> Vec<Record> {
    let mut reader = open_reader(source).unwrap();
    reader.records().collect::<Result<Vec<_>, _>>().unwrap()
}

fn sorted(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

#[test]
fn dir_to_json_migration_counts_and_preserves() {
    let dir = tempdir().unwrap();
    let src = locator(format!("dir://{}", dir.path().join("src").display()));
    let dst = locator(format!("json:{}", dir.path().join("out.jsonl").display()));
    seed(&src);

    let stats = migrate(open_reader(&src).unwrap(), open_writer(&dst).unwrap()).unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.design_documents, 1);
    assert_eq!(stats.total(), 3);

    let records = read_back(&dst);
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| r.is_design()).count(), 1);
    let beer = records.iter().find(|r| r.id == "beer-1").unwrap();
    assert_eq!(beer.value["abv"], json!(5.2));
}

#[test]
fn json_to_zip_round_trip_preserves_records() {
    let dir = tempdir().unwrap();
    let json_loc = locator(format!("json:{}", dir.path().join("dump.jsonl").display()));
    let zip_loc = locator(format!("zip://{}", dir.path().join("backup.zip").display()));
    seed(&json_loc);

    migrate(
        open_reader(&json_loc).unwrap(),
        open_writer(&zip_loc).unwrap(),
    )
    .unwrap();

    assert_eq!(sorted(read_back(&json_loc)), sorted(read_back(&zip_loc)));
}

#[test]
fn expanded_dir_destination_reassembles_documents() {
    let dir = tempdir().unwrap();
    let json_loc = locator(format!("json:{}", dir.path().join("dump.jsonl").display()));
    let dir_loc = locator(format!("dir://{}", dir.path().join("tree").display()));
    seed(&json_loc);

    migrate(
        open_reader(&json_loc).unwrap(),
        open_expanded_writer(&dir_loc).unwrap(),
    )
    .unwrap();

    assert!(dir.path().join("tree/docs/beer-1/name.json").is_file());
    assert!(dir.path().join("tree/design_docs/views/views/all/map.json").is_file());
    assert_eq!(sorted(read_back(&json_loc)), sorted(read_back(&dir_loc)));
}

#[test]
fn expanded_mode_needs_a_dir_or_zip_destination() {
    let Err(err) = open_expanded_writer(&locator("csv:out.csv")) else {
        panic!("expected a destination error")
    };
    assert!(matches!(err, Error::Destination(_)));
}

#[test]
fn progress_callback_sees_every_record() {
    let dir = tempdir().unwrap();
    let src = locator(format!("dir://{}", dir.path().join("src").display()));
    let dst = locator(format!("json:{}", dir.path().join("out.jsonl").display()));
    seed(&src);

    let mut ids = Vec::new();
    migrate_with_progress(
        open_reader(&src).unwrap(),
        open_writer(&dst).unwrap(),
        |record| ids.push(record.id.clone()),
    )
    .unwrap();

    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"_design/views".to_string()));
}
