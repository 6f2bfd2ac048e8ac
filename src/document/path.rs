use crate::errors::{DbError, Result};
use bson::{Bson, Document};
use std::fmt;

pub(crate) const MAX_PATH_DEPTH: usize = 100;
/// Most null slots a single write may append to pad an array.
pub(crate) const MAX_ARRAY_PADDING: usize = 1_500_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    /// The `$` marker, resolved against a match query before use.
    Positional,
}

/// A dotted field path used as an update target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(DbError::InvalidOperatorSpec("empty field path".into()));
        }
        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "field path '{path}' contains an empty segment"
                )));
            }
            if part == "$" {
                segments.push(Segment::Positional);
            } else if part.starts_with('$') {
                return Err(DbError::InvalidOperatorSpec(format!(
                    "field path '{path}' has an unsupported segment '{part}'"
                )));
            } else {
                segments.push(Segment::Key(part.to_string()));
            }
        }
        if segments.len() > MAX_PATH_DEPTH {
            return Err(DbError::InvalidOperatorSpec(format!("field path '{path}' is too deep")));
        }
        Ok(Self { raw: path.to_string(), segments })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn has_positional(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Positional))
    }

    /// Dotted path of the array holding the positional element, if any.
    #[must_use]
    pub fn positional_prefix(&self) -> Option<String> {
        let at = self.segments.iter().position(|s| matches!(s, Segment::Positional))?;
        Some(self.raw.split('.').take(at).collect::<Vec<_>>().join("."))
    }

    /// Replace the first `$` with a concrete array index.
    #[must_use]
    pub fn with_positional(&self, index: usize) -> Self {
        let mut done = false;
        let segments: Vec<Segment> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Positional if !done => {
                    done = true;
                    Segment::Key(index.to_string())
                }
                other => other.clone(),
            })
            .collect();
        let raw = segments
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.as_str(),
                Segment::Positional => "$",
            })
            .collect::<Vec<_>>()
            .join(".");
        Self { raw, segments }
    }

    /// True if `self` equals `other` or one lies inside the other. A `$`
    /// segment may stand for any array index, so it overlaps numeric keys.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments.iter().zip(&other.segments).all(|pair| match pair {
            (Segment::Key(a), Segment::Key(b)) => a == b,
            (Segment::Positional, Segment::Positional) => true,
            (Segment::Positional, Segment::Key(k)) | (Segment::Key(k), Segment::Positional) => {
                array_index(k).is_some()
            }
        })
    }

    fn keys(&self) -> Result<Vec<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Key(k) => Ok(k.as_str()),
                Segment::Positional => Err(DbError::PathResolution(format!(
                    "positional operator in '{}' was not resolved",
                    self.raw
                ))),
            })
            .collect()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses a purely numeric segment as an array index.
#[must_use]
pub fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<usize>().ok()
}

/// Strict lookup: documents by key, arrays by numeric index. No array expansion.
#[must_use]
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = doc.get(first)?;
    for part in parts {
        cur = match cur {
            Bson::Document(d) => d.get(part)?,
            Bson::Array(arr) => arr.get(array_index(part)?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Writes `value` at `path`, creating intermediate documents as needed.
///
/// A numeric segment against an array assigns by index, padding with nulls
/// when the index is past the end.
pub fn set_path(doc: &mut Document, path: &FieldPath, value: Bson) -> Result<()> {
    let keys = path.keys()?;
    set_in_doc(doc, &keys, value, path)
}

fn set_in_doc(doc: &mut Document, keys: &[&str], value: Bson, path: &FieldPath) -> Result<()> {
    let Some((head, rest)) = keys.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        doc.insert(*head, value);
        return Ok(());
    }
    if !doc.contains_key(*head) {
        doc.insert(*head, Bson::Document(Document::new()));
    }
    match doc.get_mut(*head) {
        Some(child) => set_in_value(child, rest, value, path),
        None => Err(DbError::PathResolution(format!("cannot resolve '{path}'"))),
    }
}

fn set_in_value(node: &mut Bson, keys: &[&str], value: Bson, path: &FieldPath) -> Result<()> {
    let Some((head, rest)) = keys.split_first() else {
        return Ok(());
    };
    match node {
        Bson::Document(d) => set_in_doc(d, keys, value, path),
        Bson::Array(arr) => {
            let idx = array_index(head).ok_or_else(|| {
                DbError::PathResolution(format!(
                    "cannot use the part '{head}' of '{path}' to traverse an array"
                ))
            })?;
            if idx.saturating_sub(arr.len()) > MAX_ARRAY_PADDING {
                return Err(DbError::PathResolution(format!(
                    "'{path}' would pad the array with more than {MAX_ARRAY_PADDING} nulls"
                )));
            }
            let fresh = idx >= arr.len();
            while arr.len() <= idx {
                arr.push(Bson::Null);
            }
            if rest.is_empty() {
                arr[idx] = value;
                return Ok(());
            }
            if fresh {
                arr[idx] = Bson::Document(Document::new());
            }
            set_in_value(&mut arr[idx], rest, value, path)
        }
        other => Err(DbError::PathResolution(format!(
            "cannot create field '{head}' of '{path}' in element {other}"
        ))),
    }
}

/// Removes the field at `path`. An array element is replaced with null instead of
/// shifting its neighbours. Missing locations are a no-op.
pub fn unset_path(doc: &mut Document, path: &FieldPath) -> Result<bool> {
    let keys = path.keys()?;
    let Some((last, parents)) = keys.split_last() else {
        return Ok(false);
    };
    let Some((first, middle)) = parents.split_first() else {
        return Ok(doc.remove(*last).is_some());
    };
    let mut cur = match doc.get_mut(*first) {
        Some(v) => v,
        None => return Ok(false),
    };
    for key in middle {
        cur = match cur {
            Bson::Document(d) => match d.get_mut(*key) {
                Some(v) => v,
                None => return Ok(false),
            },
            Bson::Array(arr) => match array_index(key).and_then(|i| arr.get_mut(i)) {
                Some(v) => v,
                None => return Ok(false),
            },
            _ => return Ok(false),
        };
    }
    match cur {
        Bson::Document(d) => Ok(d.remove(*last).is_some()),
        Bson::Array(arr) => match array_index(last).and_then(|i| arr.get_mut(i)) {
            Some(slot) => {
                *slot = Bson::Null;
                Ok(true)
            }
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

/// Moves the value at `from` to `to`, overwriting the target, then prunes
/// documents along `from` left empty by the move. Absent source is a no-op.
pub fn rename_path(doc: &mut Document, from: &FieldPath, to: &FieldPath) -> Result<bool> {
    let from_keys = from.keys()?;
    let to_keys = to.keys()?;
    ensure_no_array_on_path(doc, &from_keys, from)?;
    ensure_no_array_on_path(doc, &to_keys, to)?;
    let Some(value) = take_path(doc, &from_keys) else {
        return Ok(false);
    };
    set_path(doc, to, value)?;
    for depth in (1..from_keys.len()).rev() {
        let prefix = from_keys[..depth].join(".");
        let empty = matches!(get_path(doc, &prefix), Some(Bson::Document(d)) if d.is_empty());
        if !empty {
            break;
        }
        let _ = take_path(doc, &from_keys[..depth]);
    }
    Ok(true)
}

fn ensure_no_array_on_path(doc: &Document, keys: &[&str], path: &FieldPath) -> Result<()> {
    let parents = keys.split_last().map_or(&[][..], |(_, p)| p);
    let mut cur = doc;
    for key in parents {
        match cur.get(*key) {
            Some(Bson::Document(d)) => cur = d,
            Some(Bson::Array(_)) => {
                return Err(DbError::PathResolution(format!(
                    "'{path}' crosses an array; rename cannot target array elements"
                )));
            }
            _ => return Ok(()),
        }
    }
    Ok(())
}

// Document-only removal used by rename; arrays are rejected beforehand.
fn take_path(doc: &mut Document, keys: &[&str]) -> Option<Bson> {
    let (last, parents) = keys.split_last()?;
    let mut cur = doc;
    for key in parents {
        cur = match cur.get_mut(*key) {
            Some(Bson::Document(d)) => d,
            _ => return None,
        };
    }
    cur.remove(*last)
}
