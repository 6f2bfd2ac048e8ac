use bson::{Bson, Document, doc};
use docmock::collection::Collection;
use docmock::errors::DbError;
use docmock::query::{self, UpdateOptions, compile_update};
use docmock::types::SequentialIdGenerator;
use std::sync::Arc;

fn apply(d: Document, update: Document) -> Document {
    compile_update(&update).unwrap().apply(&d, None).unwrap()
}

#[test]
fn set_and_unset() {
    assert_eq!(apply(doc! {"_id": 1, "a": 5, "b": 1}, doc! {"$set": {"a": 1}}), doc! {"_id": 1, "a": 1, "b": 1});
    assert_eq!(apply(doc! {"_id": 1, "a": 1, "b": 1}, doc! {"$unset": {"a": 1}}), doc! {"_id": 1, "b": 1});
}

#[test]
fn push_each_with_slice() {
    assert_eq!(apply(doc! {"a": [1]}, doc! {"$push": {"a": {"$each": [2, 3], "$slice": 2}}}), doc! {"a": [1, 2]});
    assert_eq!(apply(doc! {"a": [1, 2, 3]}, doc! {"$push": {"a": {"$each": [0], "$slice": -2}}}), doc! {"a": [3, 0]});
}

#[test]
fn positional_increment_uses_matched_element() {
    let plan = compile_update(&doc! {"$inc": {"b.$": 1}}).unwrap();
    let out = plan.apply(&doc! {"b": [1, 2, 3]}, Some(&doc! {"b": 2})).unwrap();
    assert_eq!(out, doc! {"b": [1, 3, 3]});
    let err = plan.apply(&doc! {"b": [1, 2, 3]}, Some(&doc! {"c": 2})).unwrap_err();
    assert!(matches!(err, DbError::PathResolution(_)));
}

#[test]
fn conflicting_operators_fail_compilation() {
    let err = compile_update(&doc! {"$set": {"a.b": 1}, "$unset": {"a": 1}}).unwrap_err();
    assert!(matches!(err, DbError::OperatorConflict(_)));
    let err = compile_update(&doc! {"$set": {"a": 1}, "b": 2}).unwrap_err();
    assert!(matches!(err, DbError::InvalidOperatorSpec(_)));
}

#[test]
fn type_mismatches_are_reported() {
    let plan = compile_update(&doc! {"$inc": {"s": 1}}).unwrap();
    assert!(matches!(plan.apply(&doc! {"s": "x"}, None), Err(DbError::TypeMismatch(_))));
    let plan = compile_update(&doc! {"$push": {"s": 1}}).unwrap();
    assert!(matches!(plan.apply(&doc! {"s": 1}, None), Err(DbError::TypeMismatch(_))));
}

#[test]
fn add_to_set_pull_and_pop() {
    let d = apply(doc! {"t": ["a"]}, doc! {"$addToSet": {"t": {"$each": ["a", "b", "b"]}}});
    assert_eq!(d, doc! {"t": ["a", "b"]});
    let d = apply(doc! {"n": [1, 5, 9, 5]}, doc! {"$pull": {"n": {"$gte": 5}}});
    assert_eq!(d, doc! {"n": [1]});
    let d = apply(doc! {"n": [1, 2, 3]}, doc! {"$pop": {"n": -1}});
    assert_eq!(d, doc! {"n": [2, 3]});
    let d = apply(doc! {"n": [1, 2, 3, 1]}, doc! {"$pullAll": {"n": [1, 3]}});
    assert_eq!(d, doc! {"n": [2]});
}

#[test]
fn rename_moves_nested_values() {
    let d = apply(doc! {"a": {"b": 1}, "c": 2}, doc! {"$rename": {"a.b": "x.y"}});
    assert_eq!(d, doc! {"c": 2, "x": {"y": 1}});
}

#[test]
fn upsert_applies_set_on_insert_only_when_inserting() {
    let col = Arc::new(Collection::new("u".into(), Arc::new(SequentialIdGenerator::new(1))));
    let upd = doc! {"$set": {"seen": true}, "$setOnInsert": {"created": 1}};
    let opts = UpdateOptions { upsert: true, multi: false };
    let r = query::update(&col, &doc! {"name": "n"}, &upd, &opts).unwrap();
    let id = r.upserted_id.unwrap();
    assert_eq!(col.find_document(&id), Some(doc! {"_id": id.clone(), "name": "n", "seen": true, "created": 1}));

    col.update_document(&id, doc! {"name": "n"});
    let r = query::update(&col, &doc! {"name": "n"}, &upd, &opts).unwrap();
    assert_eq!((r.matched, r.modified, r.upserted_id), (1, 1, None));
    assert_eq!(col.find_document(&id), Some(doc! {"_id": id, "name": "n", "seen": true}));
}

#[test]
fn upsert_seed_expands_dotted_equalities() {
    let col = Arc::new(Collection::new("u2".into(), Arc::new(SequentialIdGenerator::new(1))));
    let opts = UpdateOptions { upsert: true, multi: true };
    let r = query::update(&col, &doc! {"a.b": 1, "c": {"$eq": 2}}, &doc! {"$inc": {"n": 1}}, &opts).unwrap();
    let stored = col.find_document(&r.upserted_id.unwrap()).unwrap();
    assert_eq!(stored.get_document("a").unwrap(), &doc! {"b": 1});
    assert_eq!(stored.get("c"), Some(&Bson::Int32(2)));
    assert_eq!(stored.get("n"), Some(&Bson::Int32(1)));
}

#[test]
fn far_array_index_is_refused() {
    let plan = compile_update(&doc! {"$set": {"a.20000000": 1}}).unwrap();
    assert!(matches!(plan.apply(&doc! {"a": [1]}, None), Err(DbError::PathResolution(_))));
    assert_eq!(apply(doc! {"a": [1]}, doc! {"$set": {"a.3": 1}}), doc! {"a": [1, Bson::Null, Bson::Null, 1]});
}
