//! Update documents compiled into [`MutationPlan`]s and applied copy-on-write.

use crate::document::{
    FieldPath, ID_FIELD, compare, get_path, is_operator_doc, rename_path, set_path, unset_path,
    values_equal,
};
use crate::errors::{DbError, Result};
use bson::{Bson, Document};
use std::cmp::Ordering;

use super::eval::eval_value;
use super::parse::{compile_elem_match, compile_field, compile_filter};
use super::sort::parse_sort;
use super::types::{
    BitSpec, FieldUpdate, Filter, MutationPlan, Order, PopEnd, PullSpec, PushSort, PushSpec,
    SortSpec, UpdateOp,
};

/// Compiles an update document. A document without operator keys is a
/// whole-body replacement; mixing the two forms is rejected.
pub fn compile_update(spec: &Document) -> Result<MutationPlan> {
    let ops = spec.keys().filter(|k| k.starts_with('$')).count();
    if ops == 0 {
        if let Some(k) = spec.keys().find(|k| k.contains('.')) {
            return Err(DbError::InvalidOperatorSpec(format!(
                "replacement field names cannot contain '.': {k}"
            )));
        }
        return Ok(MutationPlan::Replace(spec.clone()));
    }
    if ops != spec.len() {
        return Err(DbError::InvalidOperatorSpec(
            "update document mixes operators and plain fields".into(),
        ));
    }

    let mut updates = Vec::new();
    for (op, operand) in spec {
        let Bson::Document(fields) = operand else {
            return Err(DbError::InvalidOperatorSpec(format!("{op} expects a document")));
        };
        for (path, arg) in fields {
            let path = FieldPath::parse(path)?;
            let field_op = compile_op(op, &path, arg)?;
            updates.push(FieldUpdate { path, op: field_op });
        }
    }
    check_conflicts(&updates)?;
    Ok(MutationPlan::Operators(updates))
}

/// Parses a JSON update document and compiles it.
pub fn parse_update_json(json: &str) -> Result<MutationPlan> {
    let doc: Document = serde_json::from_str(json)?;
    compile_update(&doc)
}

fn compile_op(op: &str, path: &FieldPath, arg: &Bson) -> Result<UpdateOp> {
    Ok(match op {
        "$set" => UpdateOp::Set(arg.clone()),
        "$setOnInsert" => UpdateOp::SetOnInsert(arg.clone()),
        "$unset" => UpdateOp::Unset,
        "$rename" => {
            let Bson::String(to) = arg else {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "$rename target for '{path}' must be a string"
                )));
            };
            let to = FieldPath::parse(to)?;
            if path.has_positional() || to.has_positional() {
                return Err(DbError::InvalidOperatorSpec(
                    "$rename does not support the positional operator".into(),
                ));
            }
            if path.overlaps(&to) {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "$rename source '{path}' and target '{to}' overlap"
                )));
            }
            UpdateOp::Rename(to)
        }
        "$inc" => UpdateOp::Inc(numeric_operand(op, arg)?),
        "$mul" => UpdateOp::Mul(numeric_operand(op, arg)?),
        "$min" => UpdateOp::Min(arg.clone()),
        "$max" => UpdateOp::Max(arg.clone()),
        "$bit" => UpdateOp::Bit(bit_operand(arg)?),
        "$push" => UpdateOp::Push(push_operand(arg)?),
        "$pushAll" => UpdateOp::Push(PushSpec { values: array_operand(op, arg)?, ..PushSpec::default() }),
        "$addToSet" => match arg {
            Bson::Document(d) if d.contains_key("$each") => {
                if d.len() != 1 {
                    return Err(DbError::InvalidOperatorSpec(
                        "$addToSet only supports the $each modifier".into(),
                    ));
                }
                UpdateOp::AddToSet(array_operand("$each", d.get("$each").unwrap_or(&Bson::Null))?)
            }
            other => UpdateOp::AddToSet(vec![other.clone()]),
        },
        "$pop" => match whole_number(arg) {
            Some(n) if n > 0 => UpdateOp::Pop(PopEnd::Last),
            Some(n) if n < 0 => UpdateOp::Pop(PopEnd::First),
            _ => return Err(DbError::InvalidOperatorSpec("$pop expects 1 or -1".into())),
        },
        "$pull" => UpdateOp::Pull(match arg {
            Bson::Document(d) if is_operator_doc(d) => PullSpec::Matches(compile_elem_match(d)?),
            Bson::Document(d) => PullSpec::Matches(compile_filter(d)?),
            Bson::RegularExpression(_) => PullSpec::Matches(compile_field("", arg)?),
            other => PullSpec::Equals(other.clone()),
        }),
        "$pullAll" => UpdateOp::PullAll(array_operand(op, arg)?),
        other => {
            return Err(DbError::InvalidOperatorSpec(format!("unknown update operator: {other}")));
        }
    })
}

fn numeric_operand(op: &str, arg: &Bson) -> Result<Bson> {
    match arg {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => Ok(arg.clone()),
        _ => Err(DbError::InvalidOperatorSpec(format!("{op} expects a numeric operand"))),
    }
}

fn array_operand(op: &str, arg: &Bson) -> Result<Vec<Bson>> {
    match arg {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(DbError::InvalidOperatorSpec(format!("{op} expects an array"))),
    }
}

fn whole_number(arg: &Bson) -> Option<i64> {
    match arg {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        _ => None,
    }
}

fn bit_operand(arg: &Bson) -> Result<BitSpec> {
    let Bson::Document(d) = arg else {
        return Err(DbError::InvalidOperatorSpec("$bit expects a document".into()));
    };
    if d.is_empty() {
        return Err(DbError::InvalidOperatorSpec("$bit needs and, or or xor".into()));
    }
    let mut spec = BitSpec::default();
    for (k, v) in d {
        if !matches!(v, Bson::Int32(_) | Bson::Int64(_)) {
            return Err(DbError::InvalidOperatorSpec(format!("$bit {k} expects an integer")));
        }
        match k.as_str() {
            "and" => spec.and = Some(v.clone()),
            "or" => spec.or = Some(v.clone()),
            "xor" => spec.xor = Some(v.clone()),
            other => {
                return Err(DbError::InvalidOperatorSpec(format!("unknown $bit operation: {other}")));
            }
        }
    }
    Ok(spec)
}

fn push_operand(arg: &Bson) -> Result<PushSpec> {
    let d = match arg {
        Bson::Document(d) if d.contains_key("$each") => d,
        Bson::Document(d) if d.keys().any(|k| k.starts_with('$')) => {
            return Err(DbError::InvalidOperatorSpec("$push modifiers require $each".into()));
        }
        other => return Ok(PushSpec { values: vec![other.clone()], ..PushSpec::default() }),
    };
    let mut spec = PushSpec::default();
    for (k, v) in d {
        match k.as_str() {
            "$each" => spec.values = array_operand("$each", v)?,
            "$slice" => {
                spec.slice = Some(whole_number(v).ok_or_else(|| {
                    DbError::InvalidOperatorSpec("$slice expects a whole number".into())
                })?);
            }
            "$position" => {
                spec.position = Some(whole_number(v).ok_or_else(|| {
                    DbError::InvalidOperatorSpec("$position expects a whole number".into())
                })?);
            }
            "$sort" => {
                spec.sort = Some(match v {
                    Bson::Document(keys) => PushSort::Fields(parse_sort(keys)?),
                    other => match whole_number(other) {
                        Some(1) => PushSort::Value(Order::Asc),
                        Some(-1) => PushSort::Value(Order::Desc),
                        _ => {
                            return Err(DbError::InvalidOperatorSpec(
                                "$sort expects 1, -1 or a sort document".into(),
                            ));
                        }
                    },
                });
            }
            other => {
                return Err(DbError::InvalidOperatorSpec(format!("unknown $push modifier: {other}")));
            }
        }
    }
    Ok(spec)
}

// Both sides of a rename count as targets.
fn check_conflicts(updates: &[FieldUpdate]) -> Result<()> {
    let mut targets: Vec<&FieldPath> = Vec::with_capacity(updates.len());
    for u in updates {
        targets.push(&u.path);
        if let UpdateOp::Rename(to) = &u.op {
            targets.push(to);
        }
    }
    for (i, a) in targets.iter().enumerate() {
        if let Some(b) = targets[i + 1..].iter().find(|b| a.overlaps(b)) {
            return Err(DbError::OperatorConflict(format!(
                "updating '{b}' would create a conflict at '{a}'"
            )));
        }
    }
    Ok(())
}

impl MutationPlan {
    /// Applies the plan to a copy of `doc`. `match_spec` is the query that
    /// selected the document and resolves positional `$` segments.
    pub fn apply(&self, doc: &Document, match_spec: Option<&Document>) -> Result<Document> {
        self.run(doc, match_spec, false)
    }

    /// Applies the plan to an upsert seed; `$setOnInsert` only takes effect here.
    pub fn apply_upsert(&self, seed: &Document, query: &Document) -> Result<Document> {
        self.run(seed, Some(query), true)
    }

    #[must_use]
    pub fn is_replacement(&self) -> bool {
        matches!(self, Self::Replace(_))
    }

    fn run(&self, doc: &Document, match_spec: Option<&Document>, inserting: bool) -> Result<Document> {
        match self {
            Self::Replace(body) => Ok(replace_body(doc, body)),
            Self::Operators(updates) => {
                let mut out = doc.clone();
                for u in updates {
                    let path = if u.path.has_positional() {
                        resolve_positional(&u.path, doc, match_spec)?
                    } else {
                        u.path.clone()
                    };
                    apply_op(&mut out, &path, &u.op, inserting)?;
                }
                Ok(out)
            }
        }
    }
}

fn replace_body(doc: &Document, body: &Document) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD).or_else(|| body.get(ID_FIELD)) {
        out.insert(ID_FIELD, id.clone());
    }
    for (k, v) in body {
        if k != ID_FIELD {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

/// Substitutes the first `$` with the index of the first array element that
/// satisfies the parts of `match_spec` addressing that array.
fn resolve_positional(
    path: &FieldPath,
    doc: &Document,
    match_spec: Option<&Document>,
) -> Result<FieldPath> {
    let prefix = path.positional_prefix().unwrap_or_default();
    if prefix.is_empty() {
        return Err(DbError::PathResolution(format!("'{path}' cannot start with '$'")));
    }
    let Some(spec) = match_spec else {
        return Err(DbError::PathResolution(format!(
            "positional operator in '{path}' needs a match query"
        )));
    };
    let items = match get_path(doc, &prefix) {
        Some(Bson::Array(items)) => items,
        Some(_) => {
            return Err(DbError::PathResolution(format!(
                "positional operator in '{path}' needs '{prefix}' to be an array"
            )));
        }
        None => {
            return Err(DbError::PathResolution(format!(
                "positional operator in '{path}' did not find '{prefix}'"
            )));
        }
    };
    let mut parts = Vec::new();
    for (key, cond) in spec {
        if *key == prefix {
            parts.push(match cond {
                Bson::Document(d) if d.len() == 1 => match d.get("$elemMatch") {
                    Some(Bson::Document(inner)) => compile_elem_match(inner)?,
                    _ => compile_field("", cond)?,
                },
                _ => compile_field("", cond)?,
            });
        } else if let Some(rest) = key.strip_prefix(prefix.as_str()).and_then(|r| r.strip_prefix('.')) {
            parts.push(compile_field(rest, cond)?);
        }
    }
    if parts.is_empty() {
        return Err(DbError::PathResolution(format!(
            "match query does not address the array for '{path}'"
        )));
    }
    let filter = Filter::And(parts);
    let index = items.iter().position(|e| eval_value(e, &filter)).ok_or_else(|| {
        DbError::PathResolution(format!("no array element matched for '{path}'"))
    })?;
    Ok(path.with_positional(index))
}

fn apply_op(doc: &mut Document, path: &FieldPath, op: &UpdateOp, inserting: bool) -> Result<()> {
    let current = get_path(doc, path.as_str()).cloned();
    match op {
        UpdateOp::Set(v) => set_path(doc, path, v.clone()),
        UpdateOp::SetOnInsert(v) => {
            if inserting {
                set_path(doc, path, v.clone())?;
            }
            Ok(())
        }
        UpdateOp::Unset => unset_path(doc, path).map(|_| ()),
        UpdateOp::Rename(to) => rename_path(doc, path, to).map(|_| ()),
        UpdateOp::Inc(delta) => {
            let next = match current {
                None => delta.clone(),
                Some(v) => arith(&v, delta, path, "$inc")?,
            };
            set_path(doc, path, next)
        }
        UpdateOp::Mul(factor) => {
            let next = match current {
                None => zero_like(factor),
                Some(v) => arith(&v, factor, path, "$mul")?,
            };
            set_path(doc, path, next)
        }
        UpdateOp::Min(v) | UpdateOp::Max(v) => {
            let wanted = if matches!(op, UpdateOp::Min(_)) { Ordering::Less } else { Ordering::Greater };
            match current {
                Some(cur) if compare(v, &cur) != wanted => Ok(()),
                _ => set_path(doc, path, v.clone()),
            }
        }
        UpdateOp::Bit(spec) => {
            let next = apply_bits(current.as_ref(), spec, path)?;
            set_path(doc, path, next)
        }
        UpdateOp::Push(spec) => {
            let mut items = array_at(current, path, "$push")?.unwrap_or_default();
            push_values(&mut items, spec);
            set_path(doc, path, Bson::Array(items))
        }
        UpdateOp::AddToSet(values) => {
            let mut items = array_at(current, path, "$addToSet")?.unwrap_or_default();
            for v in values {
                if !items.iter().any(|e| values_equal(e, v)) {
                    items.push(v.clone());
                }
            }
            set_path(doc, path, Bson::Array(items))
        }
        UpdateOp::Pop(end) => {
            let Some(mut items) = array_at(current, path, "$pop")? else {
                return Ok(());
            };
            if items.is_empty() {
                return Ok(());
            }
            match end {
                PopEnd::First => {
                    items.remove(0);
                }
                PopEnd::Last => {
                    items.pop();
                }
            }
            set_path(doc, path, Bson::Array(items))
        }
        UpdateOp::Pull(spec) => {
            let Some(mut items) = array_at(current, path, "$pull")? else {
                return Ok(());
            };
            items.retain(|e| match spec {
                PullSpec::Equals(v) => !values_equal(e, v),
                PullSpec::Matches(f) => !eval_value(e, f),
            });
            set_path(doc, path, Bson::Array(items))
        }
        UpdateOp::PullAll(values) => {
            let Some(mut items) = array_at(current, path, "$pullAll")? else {
                return Ok(());
            };
            items.retain(|e| !values.iter().any(|v| values_equal(e, v)));
            set_path(doc, path, Bson::Array(items))
        }
    }
}

fn array_at(current: Option<Bson>, path: &FieldPath, op: &str) -> Result<Option<Vec<Bson>>> {
    match current {
        None => Ok(None),
        Some(Bson::Array(items)) => Ok(Some(items)),
        Some(other) => Err(DbError::TypeMismatch(format!(
            "{op} needs '{path}' to be an array, found {other}"
        ))),
    }
}

fn push_values(items: &mut Vec<Bson>, spec: &PushSpec) {
    let len = items.len();
    let at = match spec.position {
        None => len,
        Some(p) if p >= 0 => usize::try_from(p).map_or(len, |p| p.min(len)),
        Some(p) => usize::try_from(p.unsigned_abs()).map_or(0, |back| len.saturating_sub(back)),
    };
    items.splice(at..at, spec.values.iter().cloned());
    match &spec.sort {
        Some(PushSort::Value(order)) => {
            items.sort_by(|a, b| directed(compare(a, b), *order));
        }
        Some(PushSort::Fields(keys)) => items.sort_by(|a, b| compare_by_fields(a, b, keys)),
        None => {}
    }
    if let Some(n) = spec.slice {
        apply_slice(items, n);
    }
}

/// Keeps the first `n` elements, the last `|n|` when negative, none when zero.
pub(crate) fn apply_slice(items: &mut Vec<Bson>, n: i64) {
    let len = items.len();
    if n >= 0 {
        items.truncate(usize::try_from(n).unwrap_or(len));
    } else {
        let keep = usize::try_from(n.unsigned_abs()).unwrap_or(len).min(len);
        items.drain(..len - keep);
    }
}

fn directed(ord: Ordering, order: Order) -> Ordering {
    match order {
        Order::Asc => ord,
        Order::Desc => ord.reverse(),
    }
}

// Elements carrying none of the sort keys come first (by whole value);
// the rest compare key by key.
fn compare_by_fields(a: &Bson, b: &Bson, keys: &[SortSpec]) -> Ordering {
    let first = keys.first().map_or(Order::Asc, |k| k.order);
    let key_of = |v: &Bson, field: &str| match v {
        Bson::Document(d) => get_path(d, field).cloned(),
        _ => None,
    };
    let has_any = |v: &Bson| keys.iter().any(|k| key_of(v, &k.field).is_some());
    match (has_any(a), has_any(b)) {
        (false, false) => directed(compare(a, b), first),
        (false, true) => directed(Ordering::Less, first),
        (true, false) => directed(Ordering::Greater, first),
        (true, true) => {
            for k in keys {
                let ord = match (key_of(a, &k.field), key_of(b, &k.field)) {
                    (Some(x), Some(y)) => compare(&x, &y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if ord != Ordering::Equal {
                    return directed(ord, k.order);
                }
            }
            Ordering::Equal
        }
    }
}

fn zero_like(v: &Bson) -> Bson {
    match v {
        Bson::Int64(_) => Bson::Int64(0),
        Bson::Double(_) => Bson::Double(0.0),
        _ => Bson::Int32(0),
    }
}

/// Numeric `$inc`/`$mul` with widening Int32 -> Int64 -> Double.
fn arith(existing: &Bson, operand: &Bson, path: &FieldPath, op: &str) -> Result<Bson> {
    let mul = op == "$mul";
    let overflow = || DbError::TypeMismatch(format!("{op} on '{path}' overflows a 64-bit integer"));
    match (existing, operand) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            let r = if mul { a.checked_mul(*b) } else { a.checked_add(*b) };
            match r {
                Some(v) => Ok(Bson::Int32(v)),
                None => int64_arith(i64::from(*a), i64::from(*b), mul).ok_or_else(overflow),
            }
        }
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let (a, b) = (as_i64(existing), as_i64(operand));
            int64_arith(a, b, mul).ok_or_else(overflow)
        }
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => {
            let (a, b) = (as_f64(existing), as_f64(operand));
            Ok(Bson::Double(if mul { a * b } else { a + b }))
        }
        (other, _) => Err(DbError::TypeMismatch(format!(
            "cannot apply {op} to '{path}' holding non-numeric value {other}"
        ))),
    }
}

fn int64_arith(a: i64, b: i64, mul: bool) -> Option<Bson> {
    let r = if mul { a.checked_mul(b) } else { a.checked_add(b) };
    r.map(Bson::Int64)
}

fn as_i64(v: &Bson) -> i64 {
    match v {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        _ => 0,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(v: &Bson) -> f64 {
    match v {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => 0.0,
    }
}

fn apply_bits(current: Option<&Bson>, spec: &BitSpec, path: &FieldPath) -> Result<Bson> {
    let (mut acc, mut wide) = match current {
        None => (0i64, false),
        Some(Bson::Int32(i)) => (i64::from(*i), false),
        Some(Bson::Int64(i)) => (*i, true),
        Some(other) => {
            return Err(DbError::TypeMismatch(format!(
                "$bit needs '{path}' to be an integer, found {other}"
            )));
        }
    };
    if let Some(v) = &spec.and {
        wide |= matches!(v, Bson::Int64(_));
        acc &= as_i64(v);
    }
    if let Some(v) = &spec.or {
        wide |= matches!(v, Bson::Int64(_));
        acc |= as_i64(v);
    }
    if let Some(v) = &spec.xor {
        wide |= matches!(v, Bson::Int64(_));
        acc ^= as_i64(v);
    }
    if wide {
        return Ok(Bson::Int64(acc));
    }
    Ok(i32::try_from(acc).map_or(Bson::Int64(acc), Bson::Int32))
}
