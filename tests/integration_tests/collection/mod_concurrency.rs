use bson::{Bson, doc};
use docmock::collection::Collection;
use docmock::query::{self, FindOptions, UpdateOptions};
use docmock::types::SequentialIdGenerator;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_increments_are_not_lost() {
    let col = Arc::new(Collection::new("counter".into(), Arc::new(SequentialIdGenerator::new(1))));
    col.insert_document(doc! {"_id": "c", "n": 0}).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let col = Arc::clone(&col);
            thread::spawn(move || {
                for _ in 0..50 {
                    query::update(&col, &doc! {"_id": "c"}, &doc! {"$inc": {"n": 1}}, &UpdateOptions::default())
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let doc = col.find_document(&Bson::String("c".into())).unwrap();
    assert_eq!(doc.get_i32("n").unwrap(), 400);
}

#[test]
fn concurrent_upserts_insert_once() {
    let col = Arc::new(Collection::new("ups".into(), Arc::new(SequentialIdGenerator::new(1))));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let col = Arc::clone(&col);
            thread::spawn(move || {
                let opts = UpdateOptions { upsert: true, multi: false };
                query::update(&col, &doc! {"key": "only"}, &doc! {"$inc": {"hits": 1}}, &opts).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let docs = query::find_docs(&col, &doc! {"key": "only"}, &FindOptions::default()).unwrap().to_vec();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_i32("hits").unwrap(), 8);
}

#[test]
fn concurrent_inserts_get_distinct_ids() {
    let col = Arc::new(Collection::new("ins".into(), Arc::new(SequentialIdGenerator::new(1))));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let col = Arc::clone(&col);
            thread::spawn(move || (0..25).map(|i| col.insert_document(doc! {"t": t, "i": i}).unwrap()).collect::<Vec<_>>())
        })
        .collect();
    let mut all = BTreeSet::new();
    for h in handles {
        for id in h.join().unwrap() {
            let Bson::Int64(n) = id else { panic!("unexpected id {id}") };
            assert!(all.insert(n));
        }
    }
    assert_eq!(all.len(), 100);
    assert_eq!(col.len(), 100);
}
