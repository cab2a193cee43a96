//! File system based segment repository
//!
//! Layout under the root directory:
//!
//! ```text
//! segments/<id>.yaml      one segment per file
//! ongoing_emails.yaml     every ongoing email, as a list
//! ```

use async_trait::async_trait;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::models::{is_valid_id, Segment, SegmentOngoingEmail};
use crate::traits::{SegmentRepository, WritableSegmentRepository};
use crate::{RepositoryError, RepositoryResult};

const SEGMENTS_DIR: &str = "segments";
const ONGOING_EMAILS_FILE: &str = "ongoing_emails.yaml";

/// Segment repository backed by YAML files
pub struct FileSystemSegmentRepository {
    root_path: PathBuf,
    /// Serializes read-modify-write cycles on the ongoing email list
    write_lock: Mutex<()>,
}

impl FileSystemSegmentRepository {
    /// Open an existing repository directory
    ///
    /// # Example
    /// ```no_run
    /// use roster_repository::FileSystemSegmentRepository;
    ///
    /// let repo = FileSystemSegmentRepository::new("segments").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(root_path: P) -> RepositoryResult<Self> {
        let path = root_path.as_ref();

        if !path.is_dir() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let abs_path = path
            .absolutize()
            .map_err(|e| RepositoryError::Other(format!("Failed to absolutize path: {}", e)))?
            .to_path_buf();

        Ok(Self {
            root_path: abs_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Open a repository directory, creating it when missing
    pub async fn create<P: AsRef<Path>>(root_path: P) -> RepositoryResult<Self> {
        fs::create_dir_all(root_path.as_ref().join(SEGMENTS_DIR)).await?;
        Self::new(root_path)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn segment_path(&self, id: &str) -> RepositoryResult<PathBuf> {
        if !is_valid_id(id) {
            return Err(RepositoryError::InvalidId { id: id.to_string() });
        }
        Ok(self
            .root_path
            .join(SEGMENTS_DIR)
            .join(format!("{}.yaml", id)))
    }

    async fn read_emails(&self) -> RepositoryResult<Vec<SegmentOngoingEmail>> {
        let path = self.root_path.join(ONGOING_EMAILS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    async fn write_emails(&self, emails: &[SegmentOngoingEmail]) -> RepositoryResult<()> {
        let content = serde_yaml::to_string(emails)?;
        write_atomic(&self.root_path.join(ONGOING_EMAILS_FILE), &content).await
    }
}

/// Write through a sibling temp file so readers never see a partial document
async fn write_atomic(path: &Path, content: &str) -> RepositoryResult<()> {
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl SegmentRepository for FileSystemSegmentRepository {
    async fn list_segments(&self) -> RepositoryResult<Vec<Segment>> {
        let dir = self.root_path.join(SEGMENTS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut segments = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_yaml = matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("yaml") | Some("yml")
            );
            if !is_yaml {
                continue;
            }

            let content = fs::read_to_string(&path).await?;
            match serde_yaml::from_str::<Segment>(&content) {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable segment file");
                }
            }
        }

        segments.sort_by(Segment::display_cmp);
        tracing::debug!(count = segments.len(), root = %self.root_path.display(), "Listed segments");
        Ok(segments)
    }

    async fn load_segment(&self, id: &str) -> RepositoryResult<Segment> {
        let path = self.segment_path(id)?;
        if !path.exists() {
            return Err(RepositoryError::NotFound { id: id.to_string() });
        }

        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml::from_str(&content)?)
    }

    async fn ongoing_emails(&self, segment_id: &str) -> RepositoryResult<Vec<SegmentOngoingEmail>> {
        Ok(self
            .read_emails()
            .await?
            .into_iter()
            .filter(|email| email.segment_id == segment_id)
            .collect())
    }
}

#[async_trait]
impl WritableSegmentRepository for FileSystemSegmentRepository {
    async fn save_segment(&self, segment: &Segment) -> RepositoryResult<()> {
        let path = self.segment_path(&segment.id)?;
        let content = serde_yaml::to_string(segment)?;

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(self.root_path.join(SEGMENTS_DIR)).await?;
        write_atomic(&path, &content).await?;

        tracing::info!(segment_id = %segment.id, "Saved segment");
        Ok(())
    }

    async fn delete_segment(&self, id: &str) -> RepositoryResult<bool> {
        let path = self.segment_path(id)?;

        let _guard = self.write_lock.lock().await;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).await?;

        let mut emails = self.read_emails().await?;
        let before = emails.len();
        emails.retain(|email| email.segment_id != id);
        if emails.len() != before {
            self.write_emails(&emails).await?;
        }

        tracing::info!(segment_id = %id, "Deleted segment");
        Ok(true)
    }

    async fn save_ongoing_email(&self, email: &SegmentOngoingEmail) -> RepositoryResult<()> {
        if !self.segment_path(&email.segment_id)?.exists() {
            return Err(RepositoryError::NotFound {
                id: email.segment_id.clone(),
            });
        }

        let _guard = self.write_lock.lock().await;
        let mut emails = self.read_emails().await?;
        match emails.iter_mut().find(|existing| existing.same_key(email)) {
            Some(existing) => *existing = email.clone(),
            None => emails.push(email.clone()),
        }
        self.write_emails(&emails).await
    }

    fn as_reader(self: Arc<Self>) -> Arc<dyn SegmentRepository> {
        self
    }
}
