use json_docstore::{DocStore, Update};
use serde_json::json;

fn main() -> Result<(), json_docstore::Error> {
    let path = std::env::temp_dir().join("json_docstore_example_basic.json");
    let _ = std::fs::remove_file(&path);

    let db = DocStore::new(&path);
    db.init_store()?;

    // add / get
    db.add("fruit", json!({"name": "apple", "count": 3}))?;
    db.add_many(
        "fruit",
        vec![
            json!({"name": "banana", "count": 5}),
            json!({"name": "cherry", "count": 40}),
        ],
    )?;
    println!("fruit = {:?}", db.get("fruit")?);

    // predicates
    let plenty = db.get_where("fruit", |f| f["count"].as_u64() > Some(4))?;
    println!("plenty = {plenty:?}");
    println!("first banana = {:?}", db.first_where("fruit", |f| f["name"] == "banana")?);

    // update with a transform
    db.update_where(
        "fruit",
        Update::with(|f| {
            let mut f = f.clone();
            f["count"] = json!(f["count"].as_u64().unwrap_or(0) + 1);
            f
        }),
        |f| f["name"] == "apple",
    )?;
    println!("apple after update = {:?}", db.first("fruit")?);

    // remove
    db.remove_where("fruit", |f| f["name"] == "cherry")?;
    db.remove_key("fruit")?;
    println!("keys after remove_key = {:?}", db.keys()?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
