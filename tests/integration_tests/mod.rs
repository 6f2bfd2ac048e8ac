// Aggregates per-module test suites, mirroring src/
mod collection;
mod config;
mod query;
