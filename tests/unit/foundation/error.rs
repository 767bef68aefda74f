use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GefxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(GefxError::busy("x").to_string().contains("buffer busy:"));
    assert!(
        GefxError::invalid_buffer("x")
            .to_string()
            .contains("invalid buffer:")
    );
    assert!(
        GefxError::invalid_op("x")
            .to_string()
            .contains("invalid compositing op:")
    );
    assert!(GefxError::device("x").to_string().contains("device error:"));
}

#[test]
fn out_of_memory_reports_sizes() {
    let err = GefxError::OutOfMemory {
        requested: 4096,
        available: 64,
    };
    let msg = err.to_string();
    assert!(msg.contains("4096"));
    assert!(msg.contains("64 available"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GefxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
