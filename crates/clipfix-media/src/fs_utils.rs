//! Atomic file commit.
//!
//! A destination is only ever replaced by a single `rename`. When the
//! scratch file lives on another filesystem (EXDEV) the bytes are first
//! copied into a hidden staging file next to the destination, flushed, and
//! then renamed over it. The destination itself is never opened for writing.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::sync::OwnedMutexGuard;

use crate::error::{MediaError, MediaResult};

/// Move `src` onto `dst` atomically, handling cross-device moves.
///
/// # Errors
///
/// Returns an error if the source is missing, the destination directory
/// cannot be created, or the copy/rename fails. On error `dst` is untouched.
pub async fn commit_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, staging next to destination: {} -> {}",
                src.display(),
                dst.display()
            );
            stage_and_rename(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

/// Hidden sibling of `dst` used as the copy target before the final rename.
fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let staged = format!(".{}.{}.partial", name, uuid::Uuid::new_v4().simple());
    dst.with_file_name(staged)
}

/// Copy into a staging file on the destination filesystem, then rename.
async fn stage_and_rename(src: &Path, dst: &Path) -> MediaResult<()> {
    let staged = staging_path(dst);

    let copied = async {
        fs::copy(src, &staged).await?;
        fs::File::open(&staged).await?.sync_all().await?;
        fs::rename(&staged, dst).await
    }
    .await;

    if let Err(e) = copied {
        let _ = fs::remove_file(&staged).await;
        tracing::error!(
            "Failed to commit {} -> {} via staging file: {}",
            src.display(),
            dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }

    // Destination is already committed; a leftover scratch file is harmless.
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove scratch file after cross-device commit: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

/// Per-destination locks so one destination never has two concurrent committers.
///
/// Entries nobody holds or waits on are pruned on the next acquire, so the
/// map stays as small as the set of destinations in flight.
#[derive(Debug, Clone, Default)]
pub struct DestinationLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `dst`.
    pub async fn acquire(&self, dst: &Path) -> OwnedMutexGuard<()> {
        let key = lock_key(dst);
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Absolute, lexically normalized form of `dst` with its deepest existing
/// ancestor canonicalized, so `./a.mp4`, `a.mp4` and `x/../a.mp4` share a
/// lock whether or not the directories exist yet.
fn lock_key(dst: &Path) -> PathBuf {
    let absolute = if dst.is_absolute() {
        dst.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dst),
            Err(_) => dst.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return rest.iter().rev().fold(canonical, |path, name| path.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_commit_file_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scratch.mp4");
        let dst = dir.path().join("clip_01.mp4");

        fs::write(&src, b"processed").await.unwrap();
        fs::write(&dst, b"original").await.unwrap();

        commit_file(&src, &dst).await.unwrap();

        assert!(!src.exists(), "Scratch file should be consumed");
        assert_eq!(fs::read(&dst).await.unwrap(), b"processed");
    }

    #[tokio::test]
    async fn test_commit_file_creates_destination_dir() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scratch.mp4");
        let dst = dir.path().join("final").join("clip_01.mp4");

        fs::write(&src, b"processed").await.unwrap();
        commit_file(&src, &dst).await.unwrap();

        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_commit_missing_source_leaves_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("missing.mp4");
        let dst = dir.path().join("clip_01.mp4");
        fs::write(&dst, b"original").await.unwrap();

        assert!(commit_file(&src, &dst).await.is_err());
        assert_eq!(fs::read(&dst).await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_stage_and_rename() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scratch.mp4");
        let dst = dir.path().join("clip_01.mp4");
        fs::write(&src, b"processed").await.unwrap();
        fs::write(&dst, b"original").await.unwrap();

        stage_and_rename(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"processed");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_is_cross_device_error() {
        let exdev_error = std::io::Error::from_raw_os_error(18);
        assert!(is_cross_device_error(&exdev_error));

        let not_found = std::io::Error::from_raw_os_error(2);
        assert!(!is_cross_device_error(&not_found));
    }

    #[tokio::test]
    async fn test_destination_locks_are_exclusive() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("clip_01.mp4");
        let locks = DestinationLocks::new();

        let guard = locks.acquire(&dst).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&dst)).await;
        assert!(second.is_err(), "second committer must wait");

        let other = dir.path().join("clip_02.mp4");
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&other)).await;
        assert!(third.is_ok(), "distinct destinations proceed concurrently");

        drop(guard);
        let fourth = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&dst)).await;
        assert!(fourth.is_ok());
    }

    #[tokio::test]
    async fn test_spellings_of_one_destination_share_a_lock() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("new").join("clip_01.mp4");
        let dotted = dir.path().join("new").join(".").join("clip_01.mp4");
        let detour = dir.path().join("new").join("sub").join("..").join("clip_01.mp4");
        let locks = DestinationLocks::new();

        let guard = locks.acquire(&plain).await;
        for alias in [&dotted, &detour] {
            let waited = tokio::time::timeout(Duration::from_millis(50), locks.acquire(alias)).await;
            assert!(waited.is_err(), "{} must wait", alias.display());
        }
        drop(guard);

        assert_eq!(lock_key(&plain), lock_key(&dotted));
        assert_eq!(lock_key(&plain), lock_key(&detour));
        assert!(!dir.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let dir = TempDir::new().unwrap();
        let locks = DestinationLocks::new();

        for i in 0..16 {
            let guard = locks.acquire(&dir.path().join(format!("clip_{i:02}.mp4"))).await;
            drop(guard);
        }
        let held = locks.acquire(&dir.path().join("clip_99.mp4")).await;

        assert_eq!(locks.inner.lock().unwrap().len(), 1);
        drop(held);
    }
}
