#[path = "mod_filters.rs"]
mod filters_tests;
#[path = "mod_find.rs"]
mod find_tests;
#[path = "mod_find_and_modify.rs"]
mod find_and_modify_tests;
#[path = "mod_telemetry.rs"]
mod telemetry_tests;
#[path = "mod_update.rs"]
mod update_tests;
