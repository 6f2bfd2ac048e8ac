#[path = "prop_compare.rs"]
mod prop_compare;
