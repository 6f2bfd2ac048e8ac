use bson::{Bson, doc};
use docmock::config::{EngineConfig, IdGeneratorKind};
use docmock::engine::Engine;
use docmock::errors::DbError;
use std::collections::HashMap;
use std::io::Write;

#[test]
fn file_then_env_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docmock.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "slow_query_ms = 40\nmax_result_limit = 10\n[id_generator]\nkind = \"uuid\"").unwrap();
    drop(f);

    let file_only = EngineConfig::from_file(&path).unwrap();
    assert_eq!(file_only.id_generator, IdGeneratorKind::Uuid);
    assert_eq!(file_only.slow_query_ms, 40);

    let env = HashMap::from([("DOCMOCK_ID_GENERATOR", "sequential:100"), ("DOCMOCK_MAX_RESULT_LIMIT", "0")]);
    let merged = file_only.apply_env_from(|k| env.get(k).map(|v| (*v).to_string())).unwrap();
    assert_eq!(merged.id_generator, IdGeneratorKind::Sequential { start: 100 });
    assert_eq!(merged.max_result_limit, None);
    assert_eq!(merged.slow_query_ms, 40);
}

#[test]
fn configured_generator_feeds_collections() {
    let cfg = EngineConfig { id_generator: IdGeneratorKind::Sequential { start: 7 }, ..Default::default() };
    let engine = Engine::with_id_generator(cfg.clone(), cfg.build_id_generator());
    let col = engine.create_collection("cfg_ids");
    assert_eq!(col.insert_document(doc! {}).unwrap(), Bson::Int64(7));
    assert_eq!(engine.config().id_generator, cfg.id_generator);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, DbError::Io(_)));
}

#[test]
fn unknown_generator_kind_is_rejected() {
    let err = EngineConfig::from_toml_str("[id_generator]\nkind = \"snowflake\"").unwrap_err();
    assert!(matches!(err, DbError::Config(_)));
}
