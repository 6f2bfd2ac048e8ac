use crate::collection::{Collection, Store};
use crate::document::{Document, ID_FIELD, values_equal};
use crate::errors::{DbError, Result};
use crate::types::DocumentId;
use crate::utils::num::{u128_to_u64_saturating, usize_to_u64};
use bson::Bson;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use super::cursor::Cursor;
use super::eval::{eval_filter, project_fields};
use super::parse::compile_filter;
use super::plan::{ids_in, is_single_id_query, upsert_seed};
use super::sort::{order_by, window};
use super::telemetry;
use super::types::{
    DeleteReport, Filter, FindAndModify, FindOptions, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS,
    MutationPlan, SortSpec, UpdateOptions, UpdateReport,
};
use super::update::compile_update;

/// How a query selects documents: by a literal id list, or by a compiled predicate.
enum Selector {
    Ids(Vec<Bson>),
    Scan(Filter),
}

impl Selector {
    fn compile(query: &Document) -> Result<Self> {
        match ids_in(query) {
            Some(ids) => Ok(Self::Ids(ids)),
            None => Ok(Self::Scan(compile_filter(query)?)),
        }
    }

    fn used_ids(&self) -> bool {
        matches!(self, Self::Ids(_))
    }

    /// Ids of the matching documents: id-list order for the fast path, natural order otherwise.
    fn matching_ids(&self, store: &Store) -> Vec<Bson> {
        match self {
            Self::Ids(ids) => {
                let mut seen = BTreeSet::new();
                ids.iter()
                    .filter(|id| store.contains(id) && seen.insert(DocumentId((*id).clone())))
                    .cloned()
                    .collect()
            }
            Self::Scan(filter) => store
                .iter()
                .filter(|d| eval_filter(d, filter))
                .filter_map(|d| d.get(ID_FIELD).cloned())
                .collect(),
        }
    }

    fn matching_docs(&self, store: &Store) -> Vec<Document> {
        match self {
            Self::Ids(_) => self
                .matching_ids(store)
                .iter()
                .filter_map(|id| store.get(id).cloned())
                .collect(),
            Self::Scan(filter) => store.iter().filter(|d| eval_filter(d, filter)).cloned().collect(),
        }
    }
}

fn capped_sort(sort: Option<&[SortSpec]>) -> &[SortSpec] {
    let sort = sort.unwrap_or_default();
    if sort.len() > MAX_SORT_FIELDS {
        log::warn!("sort spec too long: {}", sort.len());
        return &sort[..MAX_SORT_FIELDS];
    }
    sort
}

fn project(doc: Document, fields: Option<&Vec<String>>) -> Document {
    match fields {
        Some(fields) => {
            let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
            project_fields(&doc, &fields)
        }
        None => doc,
    }
}

/// Effective limit after applying the engine-wide result cap.
fn effective_limit(requested: i64) -> i64 {
    match telemetry::max_result_limit().and_then(|m| i64::try_from(m).ok()) {
        Some(max) if max > 0 && (requested == 0 || requested.unsigned_abs() > max.unsigned_abs()) => max,
        _ => requested,
    }
}

/// Runs a query and returns a cursor over snapshots of the matching documents.
pub fn find_docs(col: &Arc<Collection>, query: &Document, opts: &FindOptions) -> Result<Cursor> {
    let bench_start = Instant::now();
    let selector = Selector::compile(query).inspect_err(|e| telemetry::log_error("find", &col.name_str(), e))?;
    let store = col.lock();
    let docs = selector.matching_docs(&store);
    let docs = order_by(docs, capped_sort(opts.sort.as_deref()));
    let docs = window(docs, opts.skip.unwrap_or(0), effective_limit(opts.limit.unwrap_or(0)));
    let docs: Vec<Document> = docs.into_iter().map(|d| project(d, opts.projection.as_ref())).collect();
    drop(store);

    let dur_ms = bench_start.elapsed().as_millis();
    telemetry::log_query(&col.name_str(), "find", &format!("{query:?}"), dur_ms, docs.len());
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"find\",\"collection\":\"{}\",\"duration_ms\":{},\"used_ids\":{},\"result_count\":{},\"limit\":{},\"skip\":{}}}",
        col.name_str(),
        u128_to_u64_saturating(dur_ms),
        selector.used_ids(),
        usize_to_u64(docs.len()),
        opts.limit.unwrap_or(0),
        usize_to_u64(opts.skip.unwrap_or(0))
    );
    Ok(Cursor::new(docs))
}

pub fn count_docs(col: &Arc<Collection>, query: &Document) -> Result<usize> {
    let start = Instant::now();
    let selector = Selector::compile(query).inspect_err(|e| telemetry::log_error("count", &col.name_str(), e))?;
    let n = selector.matching_ids(&col.lock()).len();
    let dur_ms = start.elapsed().as_millis();
    telemetry::log_query(&col.name_str(), "count", &format!("{query:?}"), dur_ms, n);
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"count\",\"collection\":\"{}\",\"duration_ms\":{},\"result_count\":{}}}",
        col.name_str(),
        u128_to_u64_saturating(dur_ms),
        usize_to_u64(n)
    );
    Ok(n)
}

fn cant_update_id() -> DbError {
    DbError::DuplicateIdentifier("can't update _id".into())
}

/// A replacement may only carry an `_id` when the query pins that same `_id`.
fn check_replacement_id(plan: &MutationPlan, query: &Document) -> Result<()> {
    let MutationPlan::Replace(body) = plan else {
        return Ok(());
    };
    let Some(body_id) = body.get(ID_FIELD) else {
        return Ok(());
    };
    match query.get(ID_FIELD) {
        Some(q) if is_single_id_query(query) && values_equal(q, body_id) => Ok(()),
        _ => Err(cant_update_id()),
    }
}

/// The `_id` of an existing document never changes through an update.
fn check_id_kept(before: &Document, after: &Document) -> Result<()> {
    match (before.get(ID_FIELD), after.get(ID_FIELD)) {
        (Some(b), Some(a)) if values_equal(a, b) => Ok(()),
        (None, _) => Ok(()),
        _ => Err(cant_update_id()),
    }
}

/// Builds and inserts the upsert document for `query`, returning it as stored.
fn upsert_into(
    col: &Collection,
    store: &mut Store,
    query: &Document,
    plan: &MutationPlan,
) -> Result<(Bson, Document)> {
    let seed = upsert_seed(query)?;
    let doc = plan.apply_upsert(&seed, query)?;
    check_id_kept(&seed, &doc)?;
    let id = store.insert(doc, col.ids.as_ref())?;
    let stored = store.get(&id).cloned().unwrap_or_default();
    telemetry::log_audit("upsert", &col.name_str(), &id.to_string());
    Ok((id, stored))
}

/// Applies `update` to the documents selected by `query`.
///
/// The update is compiled before any document is touched. Each document is
/// committed as soon as its mutation succeeds; the first failure stops the loop.
pub fn update(
    col: &Arc<Collection>,
    query: &Document,
    update: &Document,
    opts: &UpdateOptions,
) -> Result<UpdateReport> {
    let op = if opts.multi { "update_many" } else { "update_one" };
    let bench_start = Instant::now();
    let res = run_update(col, query, update, opts);
    let dur_ms = bench_start.elapsed().as_millis();
    match &res {
        Ok(report) => crate::dev6!(
            "{{\"bench\":\"query\",\"op\":\"{}\",\"collection\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{},\"upserted\":{}}}",
            op,
            col.name_str(),
            u128_to_u64_saturating(dur_ms),
            report.matched,
            report.modified,
            report.upserted_id.is_some()
        ),
        Err(e) => telemetry::log_error(op, &col.name_str(), e),
    }
    res
}

fn run_update(
    col: &Arc<Collection>,
    query: &Document,
    update: &Document,
    opts: &UpdateOptions,
) -> Result<UpdateReport> {
    let plan = compile_update(update)?;
    if opts.multi && plan.is_replacement() {
        return Err(DbError::InvalidOperatorSpec("multi update only works with $ operators".into()));
    }
    check_replacement_id(&plan, query)?;
    let selector = Selector::compile(query)?;

    let mut store = col.lock();
    let mut ids = selector.matching_ids(&store);
    if !opts.multi {
        ids.truncate(1);
    }
    let mut report = UpdateReport::default();
    for id in ids {
        let Some(before) = store.get(&id).cloned() else {
            continue;
        };
        report.matched += 1;
        let after = plan.apply(&before, Some(query))?;
        check_id_kept(&before, &after)?;
        if after != before {
            store.replace(&id, after);
            report.modified += 1;
            telemetry::log_audit("update", &col.name_str(), &id.to_string());
        }
    }
    if report.matched == 0 && opts.upsert {
        let (id, _) = upsert_into(col, &mut store, query, &plan)?;
        report.upserted_id = Some(id);
    }
    Ok(report)
}

pub fn update_one(col: &Arc<Collection>, query: &Document, update: &Document, upsert: bool) -> Result<UpdateReport> {
    self::update(col, query, update, &UpdateOptions { upsert, multi: false })
}

pub fn update_many(col: &Arc<Collection>, query: &Document, update: &Document, upsert: bool) -> Result<UpdateReport> {
    self::update(col, query, update, &UpdateOptions { upsert, multi: true })
}

fn delete(col: &Arc<Collection>, query: &Document, just_one: bool) -> Result<DeleteReport> {
    let op = if just_one { "delete_one" } else { "delete_many" };
    let bench_start = Instant::now();
    let selector = Selector::compile(query).inspect_err(|e| telemetry::log_error(op, &col.name_str(), e))?;
    let mut store = col.lock();
    let mut ids = selector.matching_ids(&store);
    if just_one {
        ids.truncate(1);
    }
    let mut deleted = 0u64;
    for id in ids {
        if store.remove(&id).is_some() {
            deleted += 1;
            telemetry::log_audit("delete", &col.name_str(), &id.to_string());
        }
    }
    drop(store);
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"{}\",\"collection\":\"{}\",\"duration_ms\":{},\"deleted\":{}}}",
        op,
        col.name_str(),
        u128_to_u64_saturating(bench_start.elapsed().as_millis()),
        deleted
    );
    Ok(DeleteReport { deleted })
}

pub fn delete_many(col: &Arc<Collection>, query: &Document) -> Result<DeleteReport> {
    delete(col, query, false)
}

pub fn delete_one(col: &Arc<Collection>, query: &Document) -> Result<DeleteReport> {
    delete(col, query, true)
}

/// Atomically finds the first match in sort order and removes or updates it.
///
/// Returns the document before the change, or after it when `return_new` is set.
/// An upsert that inserts returns the new document only with `return_new`.
pub fn find_and_modify(col: &Arc<Collection>, req: &FindAndModify) -> Result<Option<Document>> {
    let bench_start = Instant::now();
    let res = run_find_and_modify(col, req);
    match &res {
        Ok(found) => crate::dev6!(
            "{{\"bench\":\"query\",\"op\":\"find_and_modify\",\"collection\":\"{}\",\"duration_ms\":{},\"remove\":{},\"found\":{}}}",
            col.name_str(),
            u128_to_u64_saturating(bench_start.elapsed().as_millis()),
            req.remove,
            found.is_some()
        ),
        Err(e) => telemetry::log_error("find_and_modify", &col.name_str(), e),
    }
    res
}

fn run_find_and_modify(col: &Arc<Collection>, req: &FindAndModify) -> Result<Option<Document>> {
    let plan = match (&req.update, req.remove) {
        (Some(u), false) => Some(compile_update(u)?),
        (None, true) => None,
        _ => {
            return Err(DbError::InvalidOperatorSpec(
                "find_and_modify needs exactly one of remove or update".into(),
            ));
        }
    };
    if let Some(plan) = &plan {
        check_replacement_id(plan, &req.query)?;
    }
    let filter = compile_filter(&req.query)?;

    let mut store = col.lock();
    let matches: Vec<Document> = store.iter().filter(|d| eval_filter(d, &filter)).cloned().collect();
    let first = order_by(matches, capped_sort(req.sort.as_deref())).into_iter().next();
    let fields = req.fields.as_ref();

    let Some(plan) = plan else {
        let Some(before) = first else {
            return Ok(None);
        };
        if let Some(id) = before.get(ID_FIELD) {
            store.remove(id);
            telemetry::log_audit("delete", &col.name_str(), &id.to_string());
        }
        return Ok(Some(project(before, fields)));
    };

    match first {
        Some(before) => {
            let after = plan.apply(&before, Some(&req.query))?;
            check_id_kept(&before, &after)?;
            if let Some(id) = before.get(ID_FIELD)
                && after != before
            {
                store.replace(id, after.clone());
                telemetry::log_audit("update", &col.name_str(), &id.to_string());
            }
            Ok(Some(project(if req.return_new { after } else { before }, fields)))
        }
        None if req.upsert => {
            let (_, stored) = upsert_into(col, &mut store, &req.query, &plan)?;
            Ok(req.return_new.then(|| project(stored, fields)))
        }
        None => Ok(None),
    }
}
