use bson::{Bson, doc};
use docmock::collection::Collection;
use docmock::errors::DbError;
use docmock::types::{SeededIdGenerator, SequentialIdGenerator};
use std::sync::Arc;

fn seq_col(name: &str) -> Collection {
    Collection::new(name.into(), Arc::new(SequentialIdGenerator::new(1)))
}

#[test]
fn generated_ids_come_first_and_are_unique() {
    let col = seq_col("gen");
    let a = col.insert_document(doc! {"name": "a"}).unwrap();
    let b = col.insert_document(doc! {"name": "b"}).unwrap();
    assert_ne!(a, b);
    let stored = col.find_document(&a).unwrap();
    assert_eq!(stored.keys().next().map(String::as_str), Some("_id"));
}

#[test]
fn duplicate_id_is_rejected_and_store_unchanged() {
    let col = seq_col("dup");
    col.insert_document(doc! {"_id": "k", "v": 1}).unwrap();
    let err = col.insert_document(doc! {"_id": "k", "v": 2}).unwrap_err();
    assert!(matches!(err, DbError::DuplicateIdentifier(_)));
    assert_eq!(col.find_document(&Bson::String("k".into())), Some(doc! {"_id": "k", "v": 1}));
}

#[test]
fn seeded_generator_is_reproducible() {
    let a = Collection::new("a".into(), Arc::new(SeededIdGenerator::new(42)));
    let b = Collection::new("b".into(), Arc::new(SeededIdGenerator::new(42)));
    let ia = a.insert_many(vec![doc! {}, doc! {}]).unwrap();
    let ib = b.insert_many(vec![doc! {}, doc! {}]).unwrap();
    assert_eq!(ia, ib);
    assert!(matches!(ia[0], Bson::ObjectId(_)));
}

#[test]
fn natural_order_survives_updates() {
    let col = seq_col("order");
    for i in 0..4 {
        col.insert_document(doc! {"_id": i}).unwrap();
    }
    assert!(col.update_document(&Bson::Int32(1), doc! {"touched": true}));
    assert!(col.delete_document(&Bson::Int32(2)));
    assert_eq!(col.list_ids(), vec![Bson::Int32(0), Bson::Int32(1), Bson::Int32(3)]);
    assert_eq!(col.get_all_documents()[1], doc! {"_id": 1, "touched": true});
}
