use codeloop_utils::CodeloopError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Write `content` for `artifact` to `path`, overwriting any previous file.
///
/// With `extra`, the file holds `content`, a blank line, then `extra`.
/// The parent directory must already exist.
///
/// # Errors
///
/// Returns [`CodeloopError::Persist`] if the file cannot be written.
pub fn persist_artifact(
    artifact: &str,
    path: &Path,
    content: &str,
    extra: Option<&str>,
) -> Result<(), CodeloopError> {
    let body = match extra {
        Some(extra) => format!("{content}\n\n{extra}"),
        None => content.to_string(),
    };

    fs::write(path, body).map_err(|source| CodeloopError::Persist {
        artifact: artifact.to_string(),
        path: path.display().to_string(),
        source,
    })?;

    debug!(artifact, path = %path.display(), "Persisted artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solution.py");

        persist_artifact("solution", &path, "x = 1", None).unwrap();
        persist_artifact("solution", &path, "x = 2", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 2");
    }

    #[test]
    fn test_persist_appends_extra() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.py");

        persist_artifact("test", &path, "def t(): pass", Some("t()")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "def t(): pass\n\nt()");
    }

    #[test]
    fn test_missing_parent_is_persist_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("solution.py");

        let err = persist_artifact("solution", &path, "x", None).unwrap_err();
        assert!(matches!(err, CodeloopError::Persist { ref artifact, .. } if artifact == "solution"));
    }
}
