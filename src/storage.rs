//! Local object store for uploaded resumes.
//!
//! Objects live at `<root>/<bucket>/<key>` and are addressed by URLs of the
//! form `store://<bucket>/<key>`, which is what gets recorded as an
//! application's resume URL.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

const URL_SCHEME: &str = "store://";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object URL '{0}'. Expected: store://bucket/key")]
    InvalidUrl(String),

    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A resume read from disk, ready to store once its application exists.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ResumeUpload {
    pub fn read(file: &Path) -> Result<Self> {
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(file.display().to_string()))?;
        Ok(Self {
            file_name: file_name.to_string(),
            bytes: fs::read(file)?,
        })
    }
}

pub fn parse_object_url(url: &str) -> Result<ObjectLocation> {
    let invalid = || StorageError::InvalidUrl(url.to_string());
    let rest = url.trim().strip_prefix(URL_SCHEME).ok_or_else(invalid)?;
    let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
    if bucket.is_empty() || key.is_empty() {
        return Err(invalid());
    }
    Ok(ObjectLocation {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

pub fn infer_content_type(key: &str) -> &'static str {
    let key = key.to_lowercase();
    if key.ends_with(".pdf") {
        "application/pdf"
    } else if key.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if key.ends_with(".doc") {
        "application/msword"
    } else if key.ends_with(".txt") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

pub struct ObjectStore {
    root: PathBuf,
    bucket: String,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.object_store_root, &config.resume_bucket)
    }

    pub fn put_resume(&self, application_id: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("{}/resume-{}", application_id, file_name);
        let path = self.object_path(&self.bucket, &key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!(bucket = %self.bucket, key = %key, bytes = bytes.len(), "object stored");
        Ok(format!("{}{}/{}", URL_SCHEME, self.bucket, key))
    }

    pub fn get(&self, url: &str) -> Result<StoredObject> {
        let location = parse_object_url(url)?;
        let path = self.object_path(&location.bucket, &location.key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(url.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(StoredObject {
            content_type: infer_content_type(&location.key).to_string(),
            key: location.key,
            bytes,
        })
    }

    /// Removes every object stored for an application. Missing is not an error.
    pub fn delete_application_objects(&self, application_id: &str) -> Result<()> {
        let dir = self.object_path(&self.bucket, application_id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        // Keys must stay inside the bucket directory
        let escapes = |s: &str| s.split('/').any(|part| part == ".." || part.is_empty()) || s.contains('\\');
        if escapes(bucket) || bucket.contains('/') || escapes(key) {
            return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ObjectStore {
        ObjectStore::new(dir.path(), "job-applications-storage")
    }

    #[test]
    fn test_parse_object_url() {
        let location = parse_object_url("store://job-applications-storage/abc/resume-cv.pdf").unwrap();
        assert_eq!(location.bucket, "job-applications-storage");
        assert_eq!(location.key, "abc/resume-cv.pdf");

        assert!(matches!(
            parse_object_url("s3://bucket/key"),
            Err(StorageError::InvalidUrl(_))
        ));
        assert!(parse_object_url("store://bucket-only").is_err());
    }

    #[test]
    fn test_infer_content_type() {
        assert_eq!(infer_content_type("a/resume-CV.PDF"), "application/pdf");
        assert_eq!(
            infer_content_type("a/resume.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(infer_content_type("a/resume.doc"), "application/msword");
        assert_eq!(infer_content_type("a/resume.txt"), "text/plain");
        assert_eq!(infer_content_type("a/resume"), "application/octet-stream");
    }

    #[test]
    fn test_put_and_get_resume() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store.put_resume("app-1", "cv.txt", b"Rust engineer").unwrap();
        assert_eq!(url, "store://job-applications-storage/app-1/resume-cv.txt");

        let object = store.get(&url).unwrap();
        assert_eq!(object.bytes, b"Rust engineer");
        assert_eq!(object.content_type, "text/plain");
        assert_eq!(object.key, "app-1/resume-cv.txt");
    }

    #[test]
    fn test_store_resume_read_from_disk() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("my resume.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();

        let upload = ResumeUpload::read(&source).unwrap();
        assert_eq!(upload.file_name, "my resume.pdf");
        let url = store(&dir).put_resume("app-2", &upload.file_name, &upload.bytes).unwrap();
        assert!(url.ends_with("app-2/resume-my resume.pdf"));
        assert_eq!(store(&dir).get(&url).unwrap().content_type, "application/pdf");
    }

    #[test]
    fn test_read_missing_resume() {
        let dir = TempDir::new().unwrap();
        let result = ResumeUpload::read(&dir.path().join("missing.pdf"));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_get_missing_object() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir).get("store://job-applications-storage/none/resume-x.pdf");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_rejects_path_escape() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir).get("store://job-applications-storage/../secrets.txt");
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(store(&dir).put_resume("..", "cv.pdf", b"x").is_err());
    }

    #[test]
    fn test_delete_application_objects() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let url = store.put_resume("app-3", "cv.txt", b"x").unwrap();

        store.delete_application_objects("app-3").unwrap();
        assert!(matches!(store.get(&url), Err(StorageError::NotFound(_))));
        // Second delete is a no-op
        store.delete_application_objects("app-3").unwrap();
    }
}
