use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pixa_types::StorageKey;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobReader, BlobRepository};

/// Suffix of in-flight writes; never reported by `list_keys`.
const TMP_SUFFIX: &str = ".tmp";

fn is_temp_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.starts_with('.') && n.ends_with(TMP_SUFFIX))
}

/// Filesystem blob repository.
///
/// Each blob lives in its own file, sharded by the first two characters of
/// its key:
///
/// ```text
/// <root>/
///   01/
///     0190f3c2...      (blob bytes, exactly as stored)
///   ab/
///     ab77e0d1...
/// ```
///
/// Writes go to a temporary sibling that is fsynced and then renamed into
/// place, so a crash mid-write never leaves a partial blob under a real key.
/// Temporary files abandoned that way are removed by
/// [`purge_incomplete`](BlobRepository::purge_incomplete).
#[derive(Clone, Debug)]
pub struct FsBlobRepository {
    root: PathBuf,
}

impl FsBlobRepository {
    /// Open (or create) a repository rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "blob repository opened");
        Ok(Self { root })
    }

    /// Root directory of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, key: &StorageKey) -> BlobResult<PathBuf> {
        validate_key(key.as_str())?;
        let shard = key.as_str().get(..2).unwrap_or(key.as_str());
        Ok(self.root.join(shard))
    }

    fn blob_path(&self, key: &StorageKey) -> BlobResult<PathBuf> {
        Ok(self.shard_dir(key)?.join(key.as_str()))
    }
}

/// Keys become file names, so only a conservative character set is accepted.
fn validate_key(key: &str) -> BlobResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_string()))
    }
}

fn not_found_as(key: &StorageKey) -> impl FnOnce(io::Error) -> BlobError + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::NotFound {
            BlobError::NotFound(key.clone())
        } else {
            BlobError::Io(e)
        }
    }
}

#[async_trait]
impl BlobRepository for FsBlobRepository {
    async fn create(&self, key: &StorageKey, data: Bytes) -> BlobResult<()> {
        let dir = self.shard_dir(key)?;
        let path = dir.join(key.as_str());
        if fs::try_exists(&path).await? {
            return Err(BlobError::AlreadyExists(key.clone()));
        }
        fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{key}{TMP_SUFFIX}"));
        let mut file = fs::File::create(&tmp).await?;
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::rename(&tmp, &path).await?;
        debug!(key = %key, size = data.len(), "blob written");
        Ok(())
    }

    async fn open_read(&self, key: &StorageKey) -> BlobResult<BlobReader> {
        let path = self.blob_path(key)?;
        let file = fs::File::open(&path).await.map_err(not_found_as(key))?;
        Ok(Box::new(file))
    }

    async fn delete(&self, key: &StorageKey) -> BlobResult<()> {
        let path = self.blob_path(key)?;
        fs::remove_file(&path).await.map_err(not_found_as(key))?;
        debug!(key = %key, "blob deleted");
        Ok(())
    }

    async fn list_keys(&self) -> BlobResult<Vec<StorageKey>> {
        let mut keys = Vec::new();
        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if validate_key(&name).is_err() {
                    continue;
                }
                if let Ok(key) = StorageKey::new(name) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    async fn exists(&self, key: &StorageKey) -> BlobResult<bool> {
        let path = self.blob_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn purge_incomplete(&self, older_than: Duration, dry_run: bool) -> BlobResult<u64> {
        let mut found = 0;
        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !is_temp_name(&entry.file_name()) {
                    continue;
                }
                let age = entry
                    .metadata()
                    .await?
                    .modified()?
                    .elapsed()
                    .unwrap_or_default();
                if age < older_than {
                    continue;
                }
                found += 1;
                if dry_run {
                    continue;
                }
                match fs::remove_file(entry.path()).await {
                    Ok(()) => debug!(path = %entry.path().display(), "removed incomplete write"),
                    // Finished or removed concurrently.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn key(s: &str) -> StorageKey {
        StorageKey::new(s).unwrap()
    }

    async fn temp_repo() -> (tempfile::TempDir, FsBlobRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsBlobRepository::open(dir.path().join("blobs")).await.unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn disk_roundtrip() {
        let (_dir, repo) = temp_repo().await;
        repo.create(&key("abc123"), Bytes::from_static(b"pixels"))
            .await
            .unwrap();

        let on_disk = repo.root().join("ab").join("abc123");
        assert!(on_disk.exists());

        let mut reader = repo.open_read(&key("abc123")).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"pixels");
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let (_dir, repo) = temp_repo().await;
        repo.create(&key("k1"), Bytes::from_static(b"a")).await.unwrap();
        let err = repo
            .create(&key("k1"), Bytes::from_static(b"b"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let (_dir, repo) = temp_repo().await;
        assert!(repo.open_read(&key("zz9")).await.err().unwrap().is_not_found());
        assert!(repo.delete(&key("zz9")).await.unwrap_err().is_not_found());
        assert!(!repo.exists(&key("zz9")).await.unwrap());
    }

    #[tokio::test]
    async fn path_traversal_keys_are_rejected() {
        let (_dir, repo) = temp_repo().await;
        for bad in ["../etc", "a/b", ".hidden"] {
            let err = repo
                .create(&key(bad), Bytes::from_static(b"x"))
                .await
                .unwrap_err();
            assert!(matches!(err, BlobError::InvalidKey(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn list_keys_skips_temp_files_and_stray_entries() {
        let (_dir, repo) = temp_repo().await;
        for k in ["aa1", "aa2", "bb1"] {
            repo.create(&key(k), Bytes::from_static(b"x")).await.unwrap();
        }
        // A crashed write and an unrelated file at the root.
        std::fs::write(repo.root().join("aa").join(".aa3.tmp"), b"partial").unwrap();
        std::fs::write(repo.root().join("README"), b"not a shard").unwrap();

        let mut keys = repo.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec![key("aa1"), key("aa2"), key("bb1")]);
    }

    #[tokio::test]
    async fn incomplete_writes_are_purged() {
        let (_dir, repo) = temp_repo().await;
        repo.create(&key("aa1"), Bytes::from_static(b"x")).await.unwrap();
        let leftover = repo.root().join("aa").join(".aa2.tmp");
        std::fs::write(&leftover, b"partial").unwrap();

        // Too young to be considered abandoned.
        assert_eq!(
            repo.purge_incomplete(Duration::from_secs(3600), false)
                .await
                .unwrap(),
            0
        );

        assert_eq!(repo.purge_incomplete(Duration::ZERO, true).await.unwrap(), 1);
        assert!(leftover.exists());

        assert_eq!(repo.purge_incomplete(Duration::ZERO, false).await.unwrap(), 1);
        assert!(!leftover.exists());
        assert_eq!(repo.list_keys().await.unwrap(), vec![key("aa1")]);
    }

    #[tokio::test]
    async fn delete_then_recreate() {
        let (_dir, repo) = temp_repo().await;
        repo.create(&key("k1"), Bytes::from_static(b"a")).await.unwrap();
        repo.delete(&key("k1")).await.unwrap();
        assert!(repo.list_keys().await.unwrap().is_empty());
        repo.create(&key("k1"), Bytes::from_static(b"b")).await.unwrap();
        assert!(repo.exists(&key("k1")).await.unwrap());
    }

    #[tokio::test]
    async fn reopen_sees_existing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = FsBlobRepository::open(dir.path()).await.unwrap();
            repo.create(&key("persist1"), Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        let repo = FsBlobRepository::open(dir.path()).await.unwrap();
        assert_eq!(repo.list_keys().await.unwrap(), vec![key("persist1")]);
    }
}
