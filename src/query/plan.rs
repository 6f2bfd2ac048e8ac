use crate::document::{FieldPath, ID_FIELD, is_operator_doc, set_path};
use crate::errors::Result;
use bson::{Bson, Document};

/// Builds the base document for an upsert from the query's literal equality
/// constraints. `{$eq: v}` counts as a literal; dotted keys become nested documents.
pub fn upsert_seed(query: &Document) -> Result<Document> {
    let mut seed = Document::new();
    collect_equalities(query, &mut seed)?;
    Ok(seed)
}

fn collect_equalities(query: &Document, seed: &mut Document) -> Result<()> {
    for (key, value) in query {
        if key == "$and" {
            if let Bson::Array(clauses) = value {
                for clause in clauses {
                    if let Bson::Document(d) = clause {
                        collect_equalities(d, seed)?;
                    }
                }
            }
            continue;
        }
        if key.starts_with('$') {
            continue;
        }
        let literal = match value {
            Bson::Document(d) if is_operator_doc(d) => match (d.len(), d.get("$eq")) {
                (1, Some(v)) => v,
                _ => continue,
            },
            Bson::RegularExpression(_) => continue,
            v => v,
        };
        set_path(seed, &FieldPath::parse(key)?, literal.clone())?;
    }
    Ok(())
}

/// Candidate ids when the query is exactly `{_id: v}` or `{_id: {$in: [...]}}`.
#[must_use]
pub fn ids_in(query: &Document) -> Option<Vec<Bson>> {
    if query.len() != 1 {
        return None;
    }
    match query.get(ID_FIELD)? {
        Bson::Document(d) if is_operator_doc(d) => match (d.len(), d.iter().next()) {
            (1, Some((op, Bson::Array(ids)))) if op == "$in" => Some(ids.clone()),
            (1, Some((op, v))) if op == "$eq" && !matches!(v, Bson::Array(_)) => Some(vec![v.clone()]),
            _ => None,
        },
        Bson::Array(_) | Bson::RegularExpression(_) => None,
        v => Some(vec![v.clone()]),
    }
}

/// True when the query selects a single document by a literal `_id`.
#[must_use]
pub fn is_single_id_query(query: &Document) -> bool {
    query.len() == 1
        && query
            .get(ID_FIELD)
            .is_some_and(|v| match v {
                Bson::Document(d) => !is_operator_doc(d),
                Bson::Array(_) | Bson::RegularExpression(_) => false,
                _ => true,
            })
}
