use bson::{Bson, doc};
use docmock::document::{compare, type_rank};
use proptest::prelude::*;
use std::cmp::Ordering;

fn any_bson_number() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        ((1i64 << 53) - 4..(1i64 << 53) + 4).prop_map(Bson::Int64),
        (-1.0e12f64..1.0e12).prop_map(Bson::Double),
        (-1.0e19f64..1.0e19).prop_map(Bson::Double),
        (0i32..8, any::<bool>()).prop_map(|(k, neg)| {
            let v = 9_007_199_254_740_992.0 + f64::from(k) * 2.0;
            Bson::Double(if neg { -v } else { v })
        }),
        Just(Bson::Double(9_223_372_036_854_775_808.0)),
        Just(Bson::Double(f64::INFINITY)),
        Just(Bson::Double(f64::NEG_INFINITY)),
        Just(Bson::Double(f64::NAN)),
    ]
}

fn any_scalar() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any_bson_number(),
        "[a-c]{0,3}".prop_map(Bson::String),
        any::<bool>().prop_map(Bson::Boolean),
        Just(Bson::Null),
        Just(Bson::MinKey),
        Just(Bson::MaxKey),
        any::<i64>().prop_map(|ms| Bson::DateTime(bson::DateTime::from_millis(ms))),
    ]
}

fn any_value() -> impl Strategy<Value = Bson> {
    any_scalar().prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(Bson::Array),
            (inner.clone(), inner).prop_map(|(a, b)| Bson::Document(doc! {"x": a, "y": b})),
        ]
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn compare_is_antisymmetric(a in any_value(), b in any_value()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn compare_is_reflexive(a in any_value()) {
        prop_assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn compare_is_transitive(a in any_value(), b in any_value(), c in any_value()) {
        let mut v = [a, b, c];
        v.sort_by(compare);
        prop_assert_ne!(compare(&v[0], &v[1]), Ordering::Greater);
        prop_assert_ne!(compare(&v[1], &v[2]), Ordering::Greater);
        prop_assert_ne!(compare(&v[0], &v[2]), Ordering::Greater);
    }

    #[test]
    fn numbers_order_transitively(a in any_bson_number(), b in any_bson_number(), c in any_bson_number()) {
        let mut v = [a, b, c];
        v.sort_by(compare);
        prop_assert_ne!(compare(&v[0], &v[2]), Ordering::Greater);
        if compare(&v[0], &v[1]) == Ordering::Equal && compare(&v[1], &v[2]) == Ordering::Equal {
            prop_assert_eq!(compare(&v[0], &v[2]), Ordering::Equal);
        }
    }

    #[test]
    fn rank_decides_across_kinds(a in any_scalar(), b in any_scalar()) {
        let (ra, rb) = (type_rank(&a), type_rank(&b));
        if ra != rb {
            prop_assert_eq!(compare(&a, &b), ra.cmp(&rb));
        }
    }
}
