//! `cwd` validation shared by every sandbox mode: the cwd must canonicalize
//! to an absolute path that lies under `root_dir`, with no escape via `..`
//! segments or symlinks.

use crate::error::SandboxError;
use std::path::{Path, PathBuf};

/// Canonicalizes `cwd` and asserts it lies under `root_dir`. Both paths
/// must exist on disk - canonicalization is what resolves `..` segments
/// and symlinks, so a string-prefix check afterward is sufficient and
/// cannot be fooled by `<root_dir>/../escape`.
pub fn validate_cwd(cwd: &Path, root_dir: &Path) -> Result<PathBuf, SandboxError> {
    let resolved_cwd = cwd
        .canonicalize()
        .map_err(|_| SandboxError::InvalidCwd(cwd.display().to_string()))?;
    let resolved_root = root_dir
        .canonicalize()
        .map_err(|_| SandboxError::InvalidCwd(root_dir.display().to_string()))?;

    if resolved_cwd == resolved_root || resolved_cwd.starts_with(&resolved_root) {
        Ok(resolved_cwd)
    } else {
        Err(SandboxError::PathEscape {
            cwd: resolved_cwd.display().to_string(),
            root: resolved_root.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cwd_inside_root_is_accepted() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("work");
        fs::create_dir(&sub).unwrap();
        let resolved = validate_cwd(&sub, root.path()).unwrap();
        assert!(resolved.starts_with(root.path().canonicalize().unwrap()));
    }

    #[test]
    fn cwd_escaping_via_dotdot_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("work");
        fs::create_dir(&sub).unwrap();
        let escape = sub.join("..").join("..");
        // `escape` resolves (via canonicalize) to somewhere above `root`,
        // e.g. `<root>/..` itself - exactly the boundary case the spec calls
        // out explicitly.
        let result = validate_cwd(&escape, root.path());
        assert!(result.is_err());
    }

    #[test]
    fn root_dir_itself_is_accepted() {
        let root = tempfile::tempdir().unwrap();
        let resolved = validate_cwd(root.path(), root.path()).unwrap();
        assert_eq!(resolved, root.path().canonicalize().unwrap());
    }
}
