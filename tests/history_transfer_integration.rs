use elysia::error::TransferError;
use elysia::storage::Sender;
use elysia::transfer::{ChatHistoryTransfer, ExportOutcome, TransferFormat, TransferStatus};
use tokio_stream::StreamExt;

mod common;
use common::{create_temp_storage, message};

#[test]
fn test_export_import_round_trip_into_fresh_store() {
    let (source, dir) = create_temp_storage();
    source.insert(&message("m2", 2_000, Sender::Companion, "Halo, Kapten!")).unwrap();
    source.insert(&message("m1", 1_000, Sender::User, "Hai Elysia")).unwrap();
    source.insert(&message("m3", 3_000, Sender::User, "Cuaca hari ini?")).unwrap();

    let path = dir.path().join("backup.json");
    let status = ChatHistoryTransfer::new(source.clone())
        .export_to_path(&path, TransferFormat::Json)
        .unwrap();
    assert_eq!(
        status,
        TransferStatus::Exported {
            count: 3,
            destination: path.display().to_string(),
        }
    );

    let (target, _target_dir) = create_temp_storage();
    let imported = ChatHistoryTransfer::new(target.clone())
        .import_from_path(&path, true)
        .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(
        target.list_all_ascending().unwrap(),
        source.list_all_ascending().unwrap()
    );
}

#[test]
fn test_append_import_merges_and_overwrites_known_ids() {
    let (storage, _dir) = create_temp_storage();
    storage.insert(&message("a", 1, Sender::User, "lama")).unwrap();
    storage.insert(&message("b", 2, Sender::Companion, "tetap")).unwrap();

    let doc = br#"{"messages": [
        {"id": "a", "timestamp": 1, "sender": "USER", "text": "baru"},
        {"id": "c", "timestamp": 3, "sender": "ELYSIA", "text": "tambahan"}
    ]}"#;
    let transfer = ChatHistoryTransfer::new(storage.clone());
    assert_eq!(transfer.import(doc, false).unwrap(), 2);

    let all = storage.list_all_ascending().unwrap();
    let texts: Vec<_> = all.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["baru", "tetap", "tambahan"]);
}

#[test]
fn test_replace_import_discards_previous_history() {
    let (storage, _dir) = create_temp_storage();
    for i in 0..5 {
        storage
            .insert(&message(&format!("old-{}", i), i, Sender::User, "old"))
            .unwrap();
    }

    let doc = br#"{"messages": [{"id": "n", "timestamp": 10, "sender": "ELYSIA", "text": "new"}]}"#;
    ChatHistoryTransfer::new(storage.clone())
        .import(doc, true)
        .unwrap();

    let all = storage.list_all_ascending().unwrap();
    assert_eq!(all, vec![message("n", 10, Sender::Companion, "new")]);
}

#[test]
fn test_failed_replace_import_keeps_history() {
    let (storage, dir) = create_temp_storage();
    storage.insert(&message("keep", 1, Sender::User, "keep")).unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"messages\": [").unwrap();

    let err = ChatHistoryTransfer::new(storage.clone())
        .import_from_path(&path, true)
        .unwrap_err();
    assert!(matches!(err, TransferError::MalformedDocument(_)));
    assert_eq!(storage.count().unwrap(), 1);
}

#[test]
fn test_empty_file_import() {
    let (storage, dir) = create_temp_storage();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "").unwrap();

    let err = ChatHistoryTransfer::new(storage)
        .import_from_path(&path, true)
        .unwrap_err();
    assert_eq!(err, TransferError::EmptyFile);
}

#[test]
fn test_spreadsheet_import_is_unsupported() {
    let (storage, dir) = create_temp_storage();
    let path = dir.path().join("history.xlsx");
    std::fs::write(&path, "not really a spreadsheet").unwrap();

    let err = ChatHistoryTransfer::new(storage)
        .import_from_path(&path, true)
        .unwrap_err();
    assert!(matches!(err, TransferError::UnsupportedFormat(_)));
}

#[test]
fn test_empty_history_export_reports_nothing() {
    let (storage, _dir) = create_temp_storage();
    let transfer = ChatHistoryTransfer::new(storage);
    assert_eq!(transfer.export().unwrap(), ExportOutcome::EmptyHistory);
}

#[tokio::test]
async fn test_observers_see_import() {
    let (storage, _dir) = create_temp_storage();
    let mut updates = Box::pin(storage.observe_all());
    assert_eq!(updates.next().await, Some(vec![]));

    let doc = br#"{"messages": [{"id": "x", "timestamp": 5, "sender": "USER", "text": "hi"}]}"#;
    ChatHistoryTransfer::new(storage.clone())
        .import(doc, true)
        .unwrap();

    let next = tokio::time::timeout(std::time::Duration::from_secs(1), updates.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next, vec![message("x", 5, Sender::User, "hi")]);
}
