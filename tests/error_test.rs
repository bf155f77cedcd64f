use std::io;

use proyo::error::Error;
use proyo::script::{ErrorKind, ScriptError};

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let proyo_err: Error = io_err.into();

    match proyo_err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid option".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid option.");

    let err = Error::MountError {
        folder: "template/missing".to_string(),
    };
    assert_eq!(err.to_string(), "Subdirectory does not exist: template/missing.");

    let err = Error::InvalidOutputPath {
        path: "../escape".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid output path: '../escape'.");
}

#[test]
fn test_script_error_display() {
    let err = ScriptError::new(ErrorKind::NameError, "name 'x' is not defined");
    assert_eq!(err.to_string(), "NameError: name 'x' is not defined");
}

#[test]
fn test_script_error_keeps_innermost_line() {
    let err = ScriptError::syntax("invalid syntax").at_line(4).at_line(1);
    assert_eq!(err.line, Some(4));
}
