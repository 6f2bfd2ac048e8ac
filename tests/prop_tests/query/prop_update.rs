use bson::{Bson, Document, doc};
use docmock::document::{get_path, values_equal};
use docmock::query::compile_update;
use proptest::prelude::*;

fn apply(d: &Document, update: Document) -> Document {
    compile_update(&update).unwrap().apply(d, None).unwrap()
}

fn small_ints() -> impl Strategy<Value = Vec<Bson>> {
    proptest::collection::vec((-3i32..4).prop_map(Bson::Int32), 0..8)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn increments_are_additive(start in -1000i64..1000, x in -1000i64..1000, y in -1000i64..1000) {
        let d = doc! {"n": start};
        let stepwise = apply(&apply(&d, doc! {"$inc": {"n": x}}), doc! {"$inc": {"n": y}});
        let combined = apply(&d, doc! {"$inc": {"n": x + y}});
        prop_assert_eq!(stepwise, combined);
    }

    #[test]
    fn slice_is_idempotent(items in small_ints(), n in -6i64..6) {
        let d = doc! {"a": items};
        let once = apply(&d, doc! {"$push": {"a": {"$each": [], "$slice": n}}});
        let twice = apply(&once, doc! {"$push": {"a": {"$each": [], "$slice": n}}});
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn add_to_set_never_duplicates(items in small_ints(), extra in small_ints()) {
        let d = apply(&doc! {}, doc! {"$addToSet": {"s": {"$each": items}}});
        let d = apply(&d, doc! {"$addToSet": {"s": {"$each": extra}}});
        let s = d.get_array("s").unwrap();
        for (i, a) in s.iter().enumerate() {
            for b in &s[i + 1..] {
                prop_assert!(!values_equal(a, b));
            }
        }
    }

    #[test]
    fn untouched_paths_keep_their_values(a in any::<i32>(), b in any::<i32>(), c in "[a-z]{0,4}", v in any::<i32>()) {
        let d = doc! {"a": a, "nested": {"b": b, "c": c}, "list": [1, 2]};
        let out = apply(&d, doc! {"$set": {"nested.b": v}, "$unset": {"list": 1}});
        for path in ["a", "nested.c"] {
            prop_assert_eq!(get_path(&out, path), get_path(&d, path));
        }
        prop_assert_eq!(get_path(&out, "nested.b"), Some(&Bson::Int32(v)));
        prop_assert!(get_path(&out, "list").is_none());
    }
}
