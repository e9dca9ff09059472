//! Test utilities for ndkscan unit tests.

pub mod fixtures;

pub use fixtures::*;

/// Create a temporary project directory holding `fixture`.
///
/// Returns the TempDir handle - dropping it will clean up the directory.
pub fn create_test_project(fixture: &ProjectFixture) -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().expect("failed to create temp dir");
    fixture
        .write_to(tmp.path())
        .expect("failed to write project fixture");
    tmp
}

/// Assertion helpers for testing.
pub mod assertions {
    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: Result<T, anyhow::Error>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_project() {
        let project = create_test_project(&ProjectFixture::hello_jni());
        assert!(project.path().join("jni/Android.mk").exists());
        let transcript =
            std::fs::read_to_string(project.path().join("build/dry-run.txt")).unwrap();
        assert!(transcript.contains("libhello-jni.so"));
    }
}
