use bson::{Bson, Document, doc};
use docmock::collection::Collection;
use docmock::query::{self, FindAndModify, Order, SortSpec};
use docmock::types::SequentialIdGenerator;
use std::sync::Arc;

fn jobs() -> Arc<Collection> {
    let col = Arc::new(Collection::new("jobs".into(), Arc::new(SequentialIdGenerator::new(1))));
    col.insert_many(vec![
        doc! {"_id": 1, "state": "new", "prio": 1},
        doc! {"_id": 2, "state": "new", "prio": 5},
        doc! {"_id": 3, "state": "done", "prio": 9},
    ])
    .unwrap();
    col
}

fn by_prio_desc() -> Option<Vec<SortSpec>> {
    Some(vec![SortSpec { field: "prio".into(), order: Order::Desc }])
}

#[test]
fn claims_first_in_sort_order_and_returns_old() {
    let col = jobs();
    let req = FindAndModify {
        query: doc! {"state": "new"},
        sort: by_prio_desc(),
        update: Some(doc! {"$set": {"state": "running"}}),
        ..Default::default()
    };
    let before = query::find_and_modify(&col, &req).unwrap().unwrap();
    assert_eq!(before, doc! {"_id": 2, "state": "new", "prio": 5});
    assert_eq!(col.find_document(&Bson::Int32(2)).unwrap().get_str("state").unwrap(), "running");
    assert_eq!(col.find_document(&Bson::Int32(1)).unwrap().get_str("state").unwrap(), "new");
}

#[test]
fn return_new_and_field_projection() {
    let col = jobs();
    let req = FindAndModify {
        query: doc! {"_id": 1},
        update: Some(doc! {"$inc": {"prio": 10}}),
        return_new: true,
        fields: Some(vec!["prio".into()]),
        ..Default::default()
    };
    assert_eq!(query::find_and_modify(&col, &req).unwrap(), Some(doc! {"_id": 1, "prio": 11}));
}

#[test]
fn remove_returns_removed_document() {
    let col = jobs();
    let req = FindAndModify { query: doc! {"state": "done"}, remove: true, ..Default::default() };
    assert_eq!(query::find_and_modify(&col, &req).unwrap(), Some(doc! {"_id": 3, "state": "done", "prio": 9}));
    assert_eq!(col.len(), 2);
    assert_eq!(query::find_and_modify(&col, &req).unwrap(), None);
}

#[test]
fn upsert_inserts_when_nothing_matches() {
    let col = jobs();
    let mut req = FindAndModify {
        query: doc! {"state": "queued"},
        update: Some(doc! {"$set": {"prio": 0}}),
        upsert: true,
        ..Default::default()
    };
    assert_eq!(query::find_and_modify(&col, &req).unwrap(), None);
    assert_eq!(query::count_docs(&col, &doc! {"state": "queued"}).unwrap(), 1);

    req.query = doc! {"state": "parked"};
    req.return_new = true;
    let created: Document = query::find_and_modify(&col, &req).unwrap().unwrap();
    assert_eq!(created.get_str("state").unwrap(), "parked");
    assert!(created.contains_key("_id"));
}
