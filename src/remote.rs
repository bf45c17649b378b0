use crate::errors::{AppError, AppResult};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Remote document storage addressed by an opaque file reference.
pub trait RemoteStore: Send + Sync {
    fn save(&self, reference: &str, content: &str) -> AppResult<()>;
    /// `Ok(None)` when nothing has been saved under `reference`.
    fn load(&self, reference: &str) -> AppResult<Option<String>>;
}

/// Stands in for the shared team drive: keeps the latest copy of each
/// reference in a directory, plus a timestamped backup per save.
#[derive(Debug, Clone)]
pub struct LocalMirrorStore {
    root: PathBuf,
}

impl LocalMirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("backups"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, reference: &str) -> AppResult<PathBuf> {
        let name = sanitize_reference(reference);
        if name.is_empty() {
            return Err(AppError::RemoteSync("File reference cannot be empty".to_string()));
        }
        let path = self.root.join(format!("{}.json", name));
        if !path.starts_with(&self.root) {
            return Err(AppError::RemoteSync("Resolved path escaped sync directory".to_string()));
        }
        Ok(path)
    }
}

impl RemoteStore for LocalMirrorStore {
    fn save(&self, reference: &str, content: &str) -> AppResult<()> {
        let path = self.document_path(reference)?;
        fs::write(&path, content).map_err(|error| AppError::RemoteSync(error.to_string()))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let name = sanitize_reference(reference);
        let backup = self.root.join("backups").join(format!("{}-{}.json", name, stamp));
        fs::write(&backup, content).map_err(|error| AppError::RemoteSync(error.to_string()))?;

        tracing::info!(reference, path = %path.display(), backup = %backup.display(), "saved remote copy");
        Ok(())
    }

    fn load(&self, reference: &str) -> AppResult<Option<String>> {
        let path = self.document_path(reference)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|error| AppError::RemoteSync(error.to_string()))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }
}

/// Keeps the last path segment of a reference (URLs included) and replaces
/// anything outside `[A-Za-z0-9._-]`.
fn sanitize_reference(reference: &str) -> String {
    let last = reference
        .trim()
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = last.strip_suffix(".json").unwrap_or(last);
    stem.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{sanitize_reference, LocalMirrorStore, RemoteStore};

    #[test]
    fn references_reduce_to_safe_file_names() {
        assert_eq!(sanitize_reference("kpi-data"), "kpi-data");
        assert_eq!(
            sanitize_reference("https://team.example.com/sites/qbr/Shared Documents/kpi-data.json"),
            "kpi-data"
        );
        assert_eq!(sanitize_reference("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_reference("Q3 review"), "Q3_review");
        assert_eq!(sanitize_reference(".."), "");
    }

    #[test]
    fn save_then_load_returns_latest_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let remote = LocalMirrorStore::new(dir.path().join("sync")).expect("remote");

        assert!(remote.load("kpi-data").expect("load").is_none());
        remote.save("kpi-data", "{\"quarters\":[]}").expect("save");
        remote.save("kpi-data", "{\"quarters\":[\"Q1FY26\"]}").expect("save");

        let loaded = remote.load("kpi-data").expect("load").expect("content");
        assert_eq!(loaded, "{\"quarters\":[\"Q1FY26\"]}");

        let backups = std::fs::read_dir(remote.root().join("backups"))
            .expect("backups")
            .count();
        assert!(backups >= 1);
    }

    #[test]
    fn empty_reference_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let remote = LocalMirrorStore::new(dir.path()).expect("remote");
        assert!(remote.save("  ", "{}").is_err());
    }
}
