//! Document values: the cross-type order and dotted-path access.
mod order;
mod path;

pub use bson::{Bson, Document};
pub use order::{compare, same_type_bracket, type_rank, values_equal};
pub use path::{FieldPath, Segment, array_index, get_path, rename_path, set_path, unset_path};

/// Reserved identifier field.
pub const ID_FIELD: &str = "_id";

/// True when every key of `doc` starts with `$`.
#[must_use]
pub fn is_operator_doc(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}
