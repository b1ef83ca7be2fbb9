//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// ```text
/// /home/user/app/src/main/webapp/  ← cwd
/// /home/user/app/devroot.toml      ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Walk up from `start` until `config_name` exists in a directory.
///
/// Absolute names are only checked for existence.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_in_ancestor() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("src/main/webapp");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("devroot.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("devroot.toml")).unwrap();
        assert_eq!(found, temp.path().join("devroot.toml"));
    }

    #[test]
    fn test_nearest_config_wins() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("devroot.toml"), "").unwrap();
        fs::write(nested.join("devroot.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("devroot.toml")).unwrap();
        assert_eq!(found, nested.join("devroot.toml"));
    }

    #[test]
    fn test_directory_with_config_name_is_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("sub");
        fs::create_dir_all(nested.join("devroot.toml")).unwrap();
        fs::write(temp.path().join("devroot.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("devroot.toml")).unwrap();
        assert_eq!(found, temp.path().join("devroot.toml"));
    }

    #[test]
    fn test_absolute_name() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        assert!(find_config_file_from(temp.path(), &path).is_none());

        fs::write(&path, "").unwrap();
        assert_eq!(find_config_file_from(Path::new("/"), &path), Some(path));
    }
}
