//! Remembers the selected sender between runs in a one-line file.

use std::fs;
use std::path::Path;

use anyhow::Context;

use postboard_types::UserId;

/// `None` when the file is missing, unreadable or blank.
pub fn load(path: &Path) -> Option<UserId> {
    let raw = fs::read_to_string(path).ok()?;
    let id = raw.trim();
    (!id.is_empty()).then(|| UserId::from(id))
}

pub fn save(path: &Path, id: &UserId) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", id)).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identity");

        assert_eq!(load(&path), None);
        save(&path, &UserId::from("u-42")).unwrap();
        assert_eq!(load(&path), Some(UserId::from("u-42")));
    }

    #[test]
    fn blank_file_means_no_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(load(&path), None);
    }
}
