//! Scratch directories for tests.
//!
//! Pipeline tests write NetCDF inputs and outputs to disk; these helpers keep
//! every test in its own self-cleaning directory.

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
