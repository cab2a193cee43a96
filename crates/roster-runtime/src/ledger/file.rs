//! File-backed membership ledger

use super::{MembershipDiff, MembershipLedger};
use crate::error::{Result, RuntimeError};
use crate::population::EntityId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Ledger kept as one text file per segment
///
/// `<root>/<segment_id>.members` holds one entity id per line. A diff is
/// written to a sibling temp file, flushed, then renamed over the old file,
/// so a crash leaves either the previous or the new membership.
pub struct FileLedger {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Open a ledger rooted at `path`, creating the directory if needed
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let root_path = path.into();
        fs::create_dir_all(&root_path).await?;
        Ok(Self {
            root_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn segment_path(&self, segment_id: &str) -> Result<PathBuf> {
        let valid = !segment_id.is_empty()
            && segment_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RuntimeError::InvalidData(format!(
                "Segment id '{}' cannot be used as a ledger file name",
                segment_id
            )));
        }
        Ok(self.root_path.join(format!("{}.members", segment_id)))
    }

    async fn read_members(path: &Path) -> Result<BTreeSet<EntityId>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    async fn write_members(path: &Path, members: &BTreeSet<EntityId>) -> Result<()> {
        let mut content = String::new();
        for id in members {
            if id.contains('\n') {
                return Err(RuntimeError::InvalidData(format!(
                    "Entity id {:?} cannot be stored in a line-based ledger",
                    id
                )));
            }
            content.push_str(id);
            content.push('\n');
        }

        let tmp = path.with_extension("members.tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MembershipLedger for FileLedger {
    async fn members(&self, segment_id: &str) -> Result<BTreeSet<EntityId>> {
        let path = self.segment_path(segment_id)?;
        Self::read_members(&path).await
    }

    async fn apply_diff(&self, segment_id: &str, diff: &MembershipDiff) -> Result<()> {
        if diff.is_empty() {
            return Ok(());
        }

        let path = self.segment_path(segment_id)?;
        let _guard = self.write_lock.lock().await;

        let mut members = Self::read_members(&path).await?;
        for id in &diff.left {
            members.remove(id);
        }
        members.extend(diff.joined.iter().cloned());
        Self::write_members(&path, &members).await?;

        tracing::debug!(
            segment = segment_id,
            joined = diff.joined.len(),
            left = diff.left.len(),
            members = members.len(),
            "Wrote membership file"
        );
        Ok(())
    }
}
