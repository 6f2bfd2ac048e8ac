use bson::{Bson, doc};
use docmock::Database;
use docmock::errors::DbError;
use docmock::query::{FindAndModify, FindOptions, UpdateOptions};

#[test]
fn missing_collection_is_reported() {
    let db = Database::new();
    assert!(matches!(db.insert_document("nope", doc! {}), Err(DbError::NoSuchCollection(_))));
    assert!(matches!(db.count("nope", &doc! {}), Err(DbError::NoSuchCollection(_))));
    assert!(matches!(
        db.find_and_modify("nope", &FindAndModify { remove: true, ..Default::default() }),
        Err(DbError::NoSuchCollection(_))
    ));
}

#[test]
fn crud_round_through_facade() {
    let db = Database::new();
    db.create_collection("users");
    db.insert_many("users", vec![doc! {"_id": 1, "age": 30}, doc! {"_id": 2, "age": 40}, doc! {"_id": 3, "age": 50}])
        .unwrap();
    assert_eq!(db.count("users", &doc! {"age": {"$gte": 40}}).unwrap(), 2);

    let r = db.update_many("users", &doc! {"age": {"$gte": 40}}, &doc! {"$set": {"senior": true}}).unwrap();
    assert_eq!((r.matched, r.modified), (2, 2));
    let r = db.update_one("users", &doc! {"senior": true}, &doc! {"$set": {"senior": true}}).unwrap();
    assert_eq!((r.matched, r.modified), (1, 0));

    assert_eq!(db.delete_one("users", &doc! {"senior": true}).unwrap().deleted, 1);
    assert_eq!(db.delete_many("users", &doc! {}).unwrap().deleted, 2);
    assert_eq!(db.count("users", &doc! {}).unwrap(), 0);
}

#[test]
fn id_only_replacement_upserts_with_query_id() {
    let db = Database::new();
    db.create_collection("c");
    let opts = UpdateOptions { upsert: true, multi: false };
    let r = db.update("c", &doc! {"_id": "x"}, &doc! {"v": 1}, &opts).unwrap();
    assert_eq!(r.upserted_id, Some(Bson::String("x".into())));
    let r = db.update("c", &doc! {"_id": "x"}, &doc! {"_id": "x", "v": 2}, &opts).unwrap();
    assert_eq!((r.matched, r.modified, r.upserted_id), (1, 1, None));
    let got = db.find("c", &doc! {"_id": "x"}, &FindOptions::default()).unwrap().to_vec();
    assert_eq!(got, vec![doc! {"_id": "x", "v": 2}]);
}

#[test]
fn multi_replacement_is_rejected() {
    let db = Database::new();
    db.create_collection("c");
    db.insert_document("c", doc! {"a": 1}).unwrap();
    let opts = UpdateOptions { upsert: false, multi: true };
    assert!(matches!(db.update("c", &doc! {}, &doc! {"a": 2}, &opts), Err(DbError::InvalidOperatorSpec(_))));
}

#[test]
fn rename_and_list_collections() {
    let db = Database::new();
    db.create_collection("b");
    db.create_collection("a");
    db.insert_document("a", doc! {"x": 1}).unwrap();
    db.rename_collection("a", "z").unwrap();
    assert_eq!(db.list_collection_names(), vec!["b".to_string(), "z".to_string()]);
    assert_eq!(db.count("z", &doc! {"x": 1}).unwrap(), 1);
    assert!(db.delete_collection("z"));
    assert!(db.get_collection("z").is_none());
}
