use json_docstore::{CommitMode, DocStore, Error, MemoryFs};
use serde_json::{json, Value};

fn memory_store(fs: &MemoryFs) -> DocStore<MemoryFs> {
    DocStore::builder("db.json")
        .filesystem(fs.clone())
        .open()
        .unwrap()
}

#[test]
fn file_is_pretty_printed_with_two_spaces() {
    let fs = MemoryFs::new();
    let db = memory_store(&fs);
    db.add("k", json!({"n": "a"})).unwrap();

    let raw = String::from_utf8(fs.contents("db.json").unwrap()).unwrap();
    assert_eq!(raw, "{\n  \"k\": [\n    {\n      \"n\": \"a\"\n    }\n  ]\n}");
}

#[test]
fn compact_output_when_configured() {
    let fs = MemoryFs::new();
    let db = DocStore::builder("db.json")
        .filesystem(fs.clone())
        .pretty(false)
        .open()
        .unwrap();
    db.add("k", json!(1)).unwrap();
    assert_eq!(fs.contents("db.json").unwrap(), br#"{"k":[1]}"#);
}

#[test]
fn untouched_documents_keep_their_bytes() {
    let fs = MemoryFs::new();
    let original = r#"{
  "zeta": [
    {
      "z": 1,
      "a": 2
    }
  ],
  "k": [
    {
      "n": "b",
      "m": 0
    },
    {
      "y": true,
      "b": null
    }
  ]
}"#;
    fs.insert("db.json", original);
    let db = memory_store(&fs);

    db.update_where("k", json!({"n": "z"}), |d| d["n"] == "b").unwrap();

    let raw = String::from_utf8(fs.contents("db.json").unwrap()).unwrap();
    let expected = original.replace(
        "{\n      \"n\": \"b\",\n      \"m\": 0\n    }",
        "{\n      \"n\": \"z\"\n    }",
    );
    assert_ne!(expected, original);
    assert_eq!(raw, expected);
    assert_eq!(db.keys().unwrap(), vec!["zeta".to_string(), "k".to_string()]);
}

#[test]
fn malformed_file_reads_as_empty() {
    let fs = MemoryFs::new();
    fs.insert("db.json", "{ this is not json");
    let db = memory_store(&fs);

    assert_eq!(db.get("k").unwrap(), None);
    assert!(db.keys().unwrap().is_empty());
}

#[test]
fn malformed_file_is_overwritten_by_next_write() {
    let fs = MemoryFs::new();
    fs.insert("db.json", r#"{"k": "not an array", "other": [1]}"#);
    let db = memory_store(&fs);

    db.add("new", json!(true)).unwrap();
    let raw: Value = serde_json::from_slice(&fs.contents("db.json").unwrap()).unwrap();
    assert_eq!(raw, json!({"new": [true]}));
}

#[test]
fn truncated_file_reads_as_empty() {
    let fs = MemoryFs::new();
    fs.insert("db.json", "");
    let db = memory_store(&fs);
    assert_eq!(db.first("k").unwrap(), None);
}

#[test]
fn deleted_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = DocStore::new(dir.path().join("db.json"));
    db.init_store().unwrap();
    std::fs::remove_file(db.path()).unwrap();

    assert!(matches!(db.get("k"), Err(Error::Io(_))));
    assert!(matches!(db.add("k", json!(1)), Err(Error::Io(_))));
}

#[test]
fn atomic_mode_replaces_file_via_rename() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let db = DocStore::builder(&path)
        .commit_mode(CommitMode::Atomic)
        .open()
        .unwrap();

    db.add_many("k", vec![json!(1), json!(2)]).unwrap();
    db.remove_where("k", |v| v == &json!(1)).unwrap();

    assert_eq!(db.get("k").unwrap(), Some(vec![json!(2)]));
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["db.json".to_string()]);
}

#[test]
fn handles_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let a = DocStore::new(&path);
    let b = DocStore::new(&path);
    a.init_store().unwrap();
    b.init_store().unwrap();

    a.add("k", json!("from a")).unwrap();
    b.add("k", json!("from b")).unwrap();
    assert_eq!(
        a.get("k").unwrap(),
        Some(vec![json!("from a"), json!("from b")])
    );
}

#[test]
fn empty_path_is_a_config_error() {
    assert!(matches!(DocStore::builder("").build(), Err(Error::Config(_))));
}
