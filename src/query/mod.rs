// Telemetry is a submodule of query
pub mod telemetry;

mod cursor;
mod eval;
mod exec;
mod parse;
mod plan;
mod sort;
mod types;
mod update;

pub use cursor::Cursor;
pub use eval::{eval_filter, eval_value, project_fields};
pub use exec::{
    count_docs, delete_many, delete_one, find_and_modify, find_docs, update, update_many,
    update_one,
};
pub use parse::{compile_filter, parse_filter_json};
pub use plan::{ids_in, is_single_id_query, upsert_seed};
pub use sort::{compare_docs, order_by, parse_sort, window};
pub use types::{
    BitSpec, CmpOp, DeleteReport, FieldUpdate, Filter, FindAndModify, FindOptions, MutationPlan,
    Order, PopEnd, PullSpec, PushSort, PushSpec, SortSpec, UpdateOp, UpdateOptions, UpdateReport,
};
pub use update::{compile_update, parse_update_json};
