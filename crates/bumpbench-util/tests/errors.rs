use bumpbench_util::errors::BumpbenchError;

#[test]
fn io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = BumpbenchError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn config_error_display() {
    let err = BumpbenchError::Config {
        message: "zero valid credentials".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: zero valid credentials");
}

#[test]
fn candidate_error_display_carries_commit() {
    let err = BumpbenchError::Candidate {
        commit: "deadbeef".to_string(),
        message: "git clone failed".to_string(),
    };
    assert_eq!(err.to_string(), "Candidate error (deadbeef): git clone failed");
}

#[test]
fn generic_error_display() {
    let err = BumpbenchError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}
