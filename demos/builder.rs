use json_docstore::{CommitMode, DocStore, RetryPolicy};
use serde_json::json;
use std::time::Duration;

fn main() -> Result<(), json_docstore::Error> {
    let path = std::env::temp_dir().join("json_docstore_example_builder.json");
    let _ = std::fs::remove_file(&path);

    // temp-file + rename commits, and wait up to ~1s for a busy lock
    let db = DocStore::builder(&path)
        .commit_mode(CommitMode::Atomic)
        .lock_retry(RetryPolicy::fixed(50, Duration::from_millis(20)))
        .open()?;

    db.add("settings", json!({"theme": "dark"}))?;
    db.update("settings", json!({"theme": "light"}))?;

    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON:\n{contents}");
    println!("\nDebug output: {db:?}");

    let _ = std::fs::remove_file(&path);
    Ok(())
}
