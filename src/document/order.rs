use bson::Bson;
use std::cmp::Ordering;

/// Canonical rank of a value's kind in the cross-type order.
///
/// `MinKey < Null < Numbers < String < Document < Array < Binary < ObjectId`
/// `< Boolean < DateTime < Timestamp < RegularExpression < legacy kinds < MaxKey`
#[must_use]
pub fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::Decimal128(_)
        | Bson::JavaScriptCode(_)
        | Bson::JavaScriptCodeWithScope(_)
        | Bson::DbPointer(_) => 12,
        Bson::MaxKey => 255,
    }
}

/// True when both values fall in the same kind bracket (numbers count as one bracket).
#[must_use]
pub fn same_type_bracket(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

/// Total order over all values: rank first, then a kind-specific comparison.
#[must_use]
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => x.cmp(y),
        (Bson::Int64(x), Bson::Int64(y)) => x.cmp(y),
        (Bson::Int32(x), Bson::Int64(y)) => i64::from(*x).cmp(y),
        (Bson::Int64(x), Bson::Int32(y)) => x.cmp(&i64::from(*y)),
        (Bson::Double(x), Bson::Double(y)) => cmp_f64(*x, *y),
        (Bson::Double(x), Bson::Int32(y)) => cmp_f64(*x, f64::from(*y)),
        (Bson::Int32(x), Bson::Double(y)) => cmp_f64(f64::from(*x), *y),
        (Bson::Double(x), Bson::Int64(y)) => cmp_i64_f64(*y, *x).reverse(),
        (Bson::Int64(x), Bson::Double(y)) => cmp_i64_f64(*x, *y),

        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
        (Bson::String(x), Bson::Symbol(y)) | (Bson::Symbol(x), Bson::String(y)) => x.cmp(y),

        (Bson::Document(ad), Bson::Document(bd)) => {
            for ((ak, av), (bk, bv)) in ad.iter().zip(bd.iter()) {
                match ak.cmp(bk) {
                    Ordering::Equal => {
                        let ord = compare(av, bv);
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    other => return other,
                }
            }
            ad.len().cmp(&bd.len())
        }
        (Bson::Array(av), Bson::Array(bv)) => compare_slices(av, bv),

        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| u8::from(x.subtype).cmp(&u8::from(y.subtype)))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => x
            .pattern
            .as_str()
            .cmp(y.pattern.as_str())
            .then_with(|| x.options.as_str().cmp(y.options.as_str())),

        // Legacy kinds share one rank; keep the order total by kind then rendering.
        (x, y) if type_rank(x) == 12 => legacy_tag(x)
            .cmp(&legacy_tag(y))
            .then_with(|| format!("{x:?}").cmp(&format!("{y:?}"))),

        // MinKey/MinKey, MaxKey/MaxKey, Null/Undefined
        _ => Ordering::Equal,
    }
}

/// Equality under the cross-type order (so `Int32(5) == Double(5.0)`).
#[must_use]
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == Ordering::Equal
}

pub(crate) fn compare_slices(a: &[Bson], b: &[Bson]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

// NaN sorts below every other number and equals itself.
fn cmp_f64(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

// Exact comparison; an i64 does not always survive the trip through f64.
#[allow(clippy::cast_possible_truncation)]
fn cmp_i64_f64(x: i64, y: f64) -> Ordering {
    const TWO_63: f64 = 9_223_372_036_854_775_808.0;
    if y.is_nan() {
        return Ordering::Greater;
    }
    if y >= TWO_63 {
        return Ordering::Less;
    }
    if y < -TWO_63 {
        return Ordering::Greater;
    }
    let whole = y.trunc();
    x.cmp(&(whole as i64)).then_with(|| cmp_f64(0.0, y - whole))
}

fn legacy_tag(v: &Bson) -> u8 {
    match v {
        Bson::Decimal128(_) => 0,
        Bson::JavaScriptCode(_) => 1,
        Bson::JavaScriptCodeWithScope(_) => 2,
        _ => 3,
    }
}
