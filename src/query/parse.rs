use crate::document::is_operator_doc;
use crate::errors::{DbError, Result};
use bson::{Bson, Document};

use super::types::{CmpOp, Filter};

/// Compiles a query document into a [`Filter`].
///
/// Top-level keys are either field paths or the logical combinators
/// `$and`, `$or` and `$nor`. Several keys are combined with AND.
pub fn compile_filter(query: &Document) -> Result<Filter> {
    let mut parts = Vec::with_capacity(query.len());
    for (key, value) in query {
        let f = match key.as_str() {
            "$and" => Filter::And(compile_clauses("$and", value)?),
            "$or" => Filter::Or(compile_clauses("$or", value)?),
            "$nor" => Filter::Nor(compile_clauses("$nor", value)?),
            k if k.starts_with('$') => {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "unknown top level operator: {k}"
                )));
            }
            path => compile_field(path, value)?,
        };
        parts.push(f);
    }
    Ok(match parts.len() {
        0 => Filter::True,
        1 => parts.pop().unwrap_or(Filter::True),
        _ => Filter::And(parts),
    })
}

/// Parses a JSON query string and compiles it.
pub fn parse_filter_json(json: &str) -> Result<Filter> {
    let doc: Document = serde_json::from_str(json)?;
    compile_filter(&doc)
}

fn compile_clauses(op: &str, value: &Bson) -> Result<Vec<Filter>> {
    let Bson::Array(items) = value else {
        return Err(DbError::InvalidOperatorSpec(format!("{op} must be an array")));
    };
    if items.is_empty() {
        return Err(DbError::InvalidOperatorSpec(format!("{op} must be a nonempty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => compile_filter(d),
            _ => Err(DbError::InvalidOperatorSpec(format!("{op} entries must be documents"))),
        })
        .collect()
}

/// Compiles the condition for one field path. An empty path targets the value itself.
///
/// The first key decides how a document operand is read, as MongoDB does:
/// `{$gt: 1, b: 2}` is rejected, `{b: 2, $gt: 1}` is a literal document equality.
pub(crate) fn compile_field(path: &str, cond: &Bson) -> Result<Filter> {
    match cond {
        Bson::Document(d) if is_operator_doc(d) => compile_operators(path, d),
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => {
            Err(DbError::InvalidOperatorSpec(format!(
                "cannot mix operators and fields in condition for '{path}'"
            )))
        }
        Bson::RegularExpression(r) => Ok(Filter::Regex {
            path: path.to_string(),
            regex: build_regex(r.pattern.as_str(), r.options.as_str())?,
        }),
        other => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: other.clone() }),
    }
}

/// `$elemMatch` operand: operators apply to each element, a query applies to element documents.
pub(crate) fn compile_elem_match(spec: &Document) -> Result<Filter> {
    let logical = spec.keys().any(|k| matches!(k.as_str(), "$and" | "$or" | "$nor"));
    if is_operator_doc(spec) && !logical { compile_operators("", spec) } else { compile_filter(spec) }
}

fn compile_operators(path: &str, ops: &Document) -> Result<Filter> {
    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let p = path.to_string();
        let f = match op.as_str() {
            "$eq" => Filter::Cmp { path: p, op: CmpOp::Eq, value: operand.clone() },
            "$ne" => Filter::Cmp { path: p, op: CmpOp::Ne, value: operand.clone() },
            "$gt" => Filter::Cmp { path: p, op: CmpOp::Gt, value: operand.clone() },
            "$gte" => Filter::Cmp { path: p, op: CmpOp::Gte, value: operand.clone() },
            "$lt" => Filter::Cmp { path: p, op: CmpOp::Lt, value: operand.clone() },
            "$lte" => Filter::Cmp { path: p, op: CmpOp::Lte, value: operand.clone() },
            "$in" => Filter::In { path: p, values: array_operand(op, operand)? },
            "$nin" => Filter::Nin { path: p, values: array_operand(op, operand)? },
            "$all" => Filter::All { path: p, values: array_operand(op, operand)? },
            "$exists" => Filter::Exists { path: p, exists: truthy(op, operand)? },
            "$size" => Filter::Size { path: p, size: size_operand(operand)? },
            "$regex" => {
                let options = match ops.get("$options") {
                    None => None,
                    Some(Bson::String(s)) => Some(s.as_str()),
                    Some(_) => {
                        return Err(DbError::InvalidOperatorSpec("$options must be a string".into()));
                    }
                };
                let regex = match operand {
                    Bson::String(s) => build_regex(s, options.unwrap_or(""))?,
                    Bson::RegularExpression(r) => {
                        build_regex(r.pattern.as_str(), options.unwrap_or(r.options.as_str()))?
                    }
                    _ => {
                        return Err(DbError::InvalidOperatorSpec(
                            "$regex has to be a string".into(),
                        ));
                    }
                };
                Filter::Regex { path: p, regex }
            }
            "$options" => {
                if !ops.contains_key("$regex") {
                    return Err(DbError::InvalidOperatorSpec("$options needs a $regex".into()));
                }
                continue;
            }
            "$not" => match operand {
                Bson::Document(d) if is_operator_doc(d) => {
                    Filter::Not(Box::new(compile_operators(path, d)?))
                }
                Bson::RegularExpression(r) => Filter::Not(Box::new(Filter::Regex {
                    path: p,
                    regex: build_regex(r.pattern.as_str(), r.options.as_str())?,
                })),
                _ => {
                    return Err(DbError::InvalidOperatorSpec(
                        "$not needs a regex or an operator document".into(),
                    ));
                }
            },
            "$elemMatch" => match operand {
                Bson::Document(d) => {
                    Filter::ElemMatch { path: p, filter: Box::new(compile_elem_match(d)?) }
                }
                _ => {
                    return Err(DbError::InvalidOperatorSpec("$elemMatch needs a document".into()));
                }
            },
            other => {
                return Err(DbError::InvalidOperatorSpec(format!("unknown operator: {other}")));
            }
        };
        parts.push(f);
    }
    Ok(match parts.len() {
        0 => Filter::True,
        1 => parts.pop().unwrap_or(Filter::True),
        _ => Filter::And(parts),
    })
}

fn array_operand(op: &str, operand: &Bson) -> Result<Vec<Bson>> {
    match operand {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(DbError::InvalidOperatorSpec(format!("{op} needs an array"))),
    }
}

fn truthy(op: &str, operand: &Bson) -> Result<bool> {
    match operand {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(i) => Ok(*i != 0),
        Bson::Int64(i) => Ok(*i != 0),
        Bson::Double(f) => Ok(*f != 0.0),
        Bson::Null => Ok(false),
        _ => Err(DbError::InvalidOperatorSpec(format!("{op} needs a boolean"))),
    }
}

fn size_operand(operand: &Bson) -> Result<usize> {
    let n = match operand {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        Bson::Double(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    };
    n.and_then(|n| usize::try_from(n).ok()).ok_or_else(|| {
        DbError::InvalidOperatorSpec("$size needs a non-negative whole number".into())
    })
}

/// Builds a regex honouring the `i`, `m`, `s` and `x` option flags.
pub(crate) fn build_regex(pattern: &str, options: &str) -> Result<regex::Regex> {
    let mut b = regex::RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => {
                b.case_insensitive(true);
            }
            'm' => {
                b.multi_line(true);
            }
            's' => {
                b.dot_matches_new_line(true);
            }
            'x' => {
                b.ignore_whitespace(true);
            }
            'u' => {}
            other => {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "invalid regex option '{other}'"
                )));
            }
        }
    }
    b.build().map_err(|e| DbError::InvalidOperatorSpec(format!("$regex: {e}")))
}
