use crate::document::{compare, get_path};
use crate::errors::{DbError, Result};
use bson::{Bson, Document};
use std::cmp::Ordering;

use super::types::{MAX_SORT_FIELDS, Order, SortSpec};

/// Parses a sort document such as `{"age": -1, "name": 1}`.
pub fn parse_sort(spec: &Document) -> Result<Vec<SortSpec>> {
    if spec.len() > MAX_SORT_FIELDS {
        return Err(DbError::InvalidOperatorSpec(format!(
            "sort spec has {} keys, at most {MAX_SORT_FIELDS} allowed",
            spec.len()
        )));
    }
    spec.iter()
        .map(|(field, v)| {
            let sign = match v {
                Bson::Int32(i) => i64::from(*i).signum(),
                Bson::Int64(i) => i.signum(),
                Bson::Double(f) if *f > 0.0 => 1,
                Bson::Double(f) if *f < 0.0 => -1,
                _ => 0,
            };
            let order = match sign {
                1 => Order::Asc,
                -1 => Order::Desc,
                _ => {
                    return Err(DbError::InvalidOperatorSpec(format!(
                        "sort value for '{field}' must be 1 or -1"
                    )));
                }
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

/// Compares two documents under a sort specification. A missing key ranks
/// below every present value ascending and above it descending.
#[must_use]
pub fn compare_docs(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    for s in sort {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare(x, y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Stable sort; an empty spec keeps the input (storage) order.
#[must_use]
pub fn order_by(mut docs: Vec<Document>, sort: &[SortSpec]) -> Vec<Document> {
    if !sort.is_empty() {
        docs.sort_by(|a, b| compare_docs(a, b, sort));
    }
    docs
}

/// Skips `skip` documents, then keeps at most `|limit|`; a zero limit keeps all.
#[must_use]
pub fn window(docs: Vec<Document>, skip: usize, limit: i64) -> Vec<Document> {
    let take = match usize::try_from(limit.unsigned_abs()) {
        Ok(0) | Err(_) => usize::MAX,
        Ok(n) => n,
    };
    docs.into_iter().skip(skip).take(take).collect()
}
