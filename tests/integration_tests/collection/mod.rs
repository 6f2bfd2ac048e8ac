#[path = "mod_collection.rs"]
mod collection_tests;
#[path = "mod_concurrency.rs"]
mod concurrency_tests;
#[path = "mod_database.rs"]
mod database_tests;
