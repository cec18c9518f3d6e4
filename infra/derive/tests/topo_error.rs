use std::borrow::Cow;

use topo_derive::topo_error;

#[topo_error]
pub enum SampleError {
    #[error("Io failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
    #[error("Not found{}: {key}", format_context(.context))]
    NotFound { key: String, context: Option<Cow<'static, str>> },
    #[error("Internal{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn missing_file() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[test]
fn source_converts_without_context() {
    let err: SampleError = missing_file().unwrap_err().into();
    assert!(matches!(err, SampleError::Io { context: None, .. }));
    assert_eq!(err.to_string(), "Io failure: gone");
}

#[test]
fn context_on_foreign_result_wraps_source() {
    let err = missing_file().context("reading topo.toml").unwrap_err();
    assert_eq!(err.to_string(), "Io failure (reading topo.toml): gone");
}

#[test]
fn context_on_own_result_fills_slot() {
    let result: Result<(), SampleError> =
        Err(SampleError::NotFound { key: "host".to_owned(), context: None });
    let err = result.context("lookup").unwrap_err();
    assert_eq!(err.to_string(), "Not found (lookup): host");
}

#[test]
fn strings_become_internal() {
    let err = SampleError::from("boom");
    assert!(matches!(err, SampleError::Internal { ref message, .. } if message == "boom"));

    let err = SampleError::from(format!("code {}", 7));
    assert_eq!(err.to_string(), "Internal: code 7");
}
