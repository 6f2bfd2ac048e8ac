use crate::document::{array_index, compare, get_path, same_type_bracket, set_path, values_equal};
use crate::document::{FieldPath, ID_FIELD};
use bson::{Bson, Document};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter};

#[derive(Clone, Copy)]
enum Root<'a> {
    Doc(&'a Document),
    Value(&'a Bson),
}

/// Evaluates a compiled filter against a document. Never fails: unresolvable
/// paths and incomparable kinds simply do not match.
#[must_use]
pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    eval(Root::Doc(doc), filter)
}

/// Evaluates a filter against a bare value (array element, pull candidate).
/// Field paths resolve inside the value; an empty path is the value itself.
#[must_use]
pub fn eval_value(value: &Bson, filter: &Filter) -> bool {
    eval(Root::Value(value), filter)
}

fn eval(root: Root<'_>, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval(root, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval(root, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval(root, f)),
        Filter::Not(f) => !eval(root, f),
        Filter::Exists { path, exists } => !candidates(root, path).is_empty() == *exists,
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !any_match(root, path, |v| values_equal(v, value))
        }
        Filter::Cmp { path, op, value } => any_match(root, path, |v| cmp_matches(v, *op, value)),
        Filter::In { path, values } => {
            any_match(root, path, |v| values.iter().any(|x| values_equal(v, x)))
        }
        Filter::Nin { path, values } => {
            !any_match(root, path, |v| values.iter().any(|x| values_equal(v, x)))
        }
        Filter::Regex { path, regex } => any_match(root, path, |v| match v {
            Bson::String(s) | Bson::Symbol(s) => regex.is_match(s),
            _ => false,
        }),
        Filter::Size { path, size } => candidates(root, path)
            .iter()
            .any(|v| matches!(v, Bson::Array(items) if items.len() == *size)),
        Filter::All { path, values } => {
            !values.is_empty()
                && values.iter().all(|x| any_match(root, path, |v| values_equal(v, x)))
        }
        Filter::ElemMatch { path, filter } => candidates(root, path).iter().any(|v| match v {
            Bson::Array(items) => items.iter().any(|e| eval_value(e, filter)),
            _ => false,
        }),
    }
}

fn cmp_matches(v: &Bson, op: CmpOp, operand: &Bson) -> bool {
    if op == CmpOp::Eq {
        return values_equal(v, operand);
    }
    if !same_type_bracket(v, operand) {
        return false;
    }
    let ord = compare(v, operand);
    match op {
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Gte => ord != Ordering::Less,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Lte => ord != Ordering::Greater,
        CmpOp::Eq | CmpOp::Ne => ord == Ordering::Equal,
    }
}

// A leaf matches when the resolved value matches as a whole or, for arrays,
// through any one of its elements.
fn any_match(root: Root<'_>, path: &str, pred: impl Fn(&Bson) -> bool) -> bool {
    candidates(root, path).into_iter().any(|v| {
        pred(v) || matches!(v, Bson::Array(items) if items.iter().any(&pred))
    })
}

/// Resolves `path` with array expansion: a field segment applied to an array
/// descends into each document element, and a numeric segment also indexes it.
fn candidates<'a>(root: Root<'a>, path: &str) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    match root {
        Root::Value(v) if path.is_empty() => out.push(v),
        Root::Value(v) => {
            let segs: Vec<&str> = path.split('.').collect();
            resolve(v, &segs, &mut out);
        }
        Root::Doc(_) if path.is_empty() => {}
        Root::Doc(d) => {
            let segs: Vec<&str> = path.split('.').collect();
            if let Some((first, rest)) = segs.split_first()
                && let Some(v) = d.get(*first)
            {
                resolve(v, rest, &mut out);
            }
        }
    }
    out
}

fn resolve<'a>(value: &'a Bson, segs: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segs.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(d) => {
            if let Some(v) = d.get(*head) {
                resolve(v, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Some(v) = array_index(head).and_then(|i| items.get(i)) {
                resolve(v, rest, out);
            }
            for item in items {
                if matches!(item, Bson::Document(_)) {
                    resolve(item, segs, out);
                }
            }
        }
        _ => {}
    }
}

/// Inclusion projection over dotted paths; `_id` is always kept.
#[must_use]
pub fn project_fields(doc: &Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD, id.clone());
    }
    for f in fields {
        if f == ID_FIELD {
            continue;
        }
        if let (Some(v), Ok(path)) = (get_path(doc, f), FieldPath::parse(f)) {
            // a path that cannot be rebuilt in the output is dropped
            let _ = set_path(&mut out, &path, v.clone());
        }
    }
    out
}
