use docmock::errors::DbError;

#[test]
fn io_errors_convert() {
    let e: DbError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(e, DbError::Io(ref s) if s.contains("gone")));
}

#[test]
fn json_errors_convert() {
    let err = docmock::query::parse_update_json("{\"$set\":").unwrap_err();
    assert!(matches!(err, DbError::Json(_)));
    assert!(err.to_string().starts_with("Serde JSON"));
}

#[test]
fn messages_name_the_kind() {
    assert_eq!(DbError::NoSuchCollection("c".into()).to_string(), "Collection not found: c");
    assert!(DbError::TypeMismatch("x".into()).to_string().contains("Type mismatch"));
}
