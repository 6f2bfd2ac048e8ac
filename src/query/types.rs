use crate::document::FieldPath;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

// Safety limits on caller-supplied specifications
pub(crate) const MAX_SORT_FIELDS: usize = 32;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

/// Options for `find_docs`.
///
/// A `limit` of `0` means unlimited; a negative limit uses its absolute value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Vec<String>>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<i64>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    pub upsert: bool,
    pub multi: bool,
}

/// Options for `find_and_modify`. Exactly one of `remove` and `update` must be set.
#[derive(Debug, Clone, Default)]
pub struct FindAndModify {
    pub query: Document,
    pub sort: Option<Vec<SortSpec>>,
    pub update: Option<Document>,
    pub remove: bool,
    pub return_new: bool,
    pub upsert: bool,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Compiled query predicate. An empty `path` addresses the value under test itself.
#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Cmp { path: String, op: CmpOp, value: Bson },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Exists { path: String, exists: bool },
    Regex { path: String, regex: regex::Regex },
    Size { path: String, size: usize },
    All { path: String, values: Vec<Bson> },
    ElemMatch { path: String, filter: Box<Filter> },
}

#[derive(Debug, Clone)]
pub enum MutationPlan {
    /// Whole-body replacement; the stored `_id` is kept.
    Replace(Document),
    Operators(Vec<FieldUpdate>),
}

#[derive(Debug, Clone)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub op: UpdateOp,
}

#[derive(Debug, Clone)]
pub enum UpdateOp {
    Set(Bson),
    SetOnInsert(Bson),
    Unset,
    Rename(FieldPath),
    Inc(Bson),
    Mul(Bson),
    Min(Bson),
    Max(Bson),
    Bit(BitSpec),
    Push(PushSpec),
    AddToSet(Vec<Bson>),
    Pop(PopEnd),
    Pull(PullSpec),
    PullAll(Vec<Bson>),
}

/// Bitwise operands, applied in the order and, or, xor.
#[derive(Debug, Clone, Default)]
pub struct BitSpec {
    pub and: Option<Bson>,
    pub or: Option<Bson>,
    pub xor: Option<Bson>,
}

#[derive(Debug, Clone, Default)]
pub struct PushSpec {
    pub values: Vec<Bson>,
    pub position: Option<i64>,
    pub slice: Option<i64>,
    pub sort: Option<PushSort>,
}

#[derive(Debug, Clone)]
pub enum PushSort {
    Value(Order),
    Fields(Vec<SortSpec>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopEnd {
    First,
    Last,
}

#[derive(Debug, Clone)]
pub enum PullSpec {
    Equals(Bson),
    Matches(Filter),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}
