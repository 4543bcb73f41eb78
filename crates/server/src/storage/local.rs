use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{check_key, join_url, ObjectStore, StorageError};

/// Objects as files under a root directory; keys map to relative paths
#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>, public_base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.to_string(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<String, StorageError> {
        check_key(key)?;
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(&body).await?;
        file.flush().await?;

        tracing::debug!("Stored {} ({} bytes)", key, body.len());
        Ok(self.public_url(key))
    }

    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<String, StorageError> {
        check_key(key)?;
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let copied = fs::copy(path, &dest).await?;

        tracing::debug!("Stored {} ({} bytes from {})", key, copied, path.display());
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // Drop the folder once its last object is gone
        if let Some(parent) = path.parent() {
            if parent != self.root {
                let _ = fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Walk only the deepest directory the prefix names
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        if !dir_part.is_empty() {
            check_key(dir_part)?;
        }
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.object_path(dir_part)
        };

        let mut keys = Vec::new();
        let mut pending = vec![(start, dir_part.to_string())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::warn!("Skipping non UTF-8 path under {}", dir.display());
                    continue;
                };
                let key = if key_prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", key_prefix, name)
                };

                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:8080/media");

        let url = store
            .put("flow-1/thumbnail.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/media/flow-1/thumbnail.jpg");
        store
            .put("flow-1/video.mp4", Bytes::from_static(b"mp4"), "video/mp4")
            .await
            .unwrap();
        store
            .put("flow-10/video.mp4", Bytes::from_static(b"mp4"), "video/mp4")
            .await
            .unwrap();

        let keys = store.list_by_prefix("flow-1/").await.unwrap();
        assert_eq!(keys, vec!["flow-1/thumbnail.jpg", "flow-1/video.mp4"]);

        let all = store.list_by_prefix("flow-1").await.unwrap();
        assert_eq!(all.len(), 3);

        store.delete("flow-1/thumbnail.jpg").await.unwrap();
        store.delete("flow-1/thumbnail.jpg").await.unwrap();
        assert_eq!(store.list_by_prefix("flow-1/").await.unwrap(), vec!["flow-1/video.mp4"]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");

        store.put("s/video.mp4", Bytes::from_static(b"first"), "video/mp4").await.unwrap();
        store.put("s/video.mp4", Bytes::from_static(b"second"), "video/mp4").await.unwrap();

        let stored = std::fs::read(dir.path().join("s").join("video.mp4")).unwrap();
        assert_eq!(stored, b"second");
        assert_eq!(store.list_by_prefix("s/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_file_copies_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");
        let source = dir.path().join("incoming.part");
        std::fs::write(&source, b"moov").unwrap();

        let url = store.put_file("s/video.mov", &source, "video/quicktime").await.unwrap();
        assert_eq!(url, "http://x/s/video.mov");
        assert_eq!(std::fs::read(dir.path().join("s").join("video.mov")).unwrap(), b"moov");
        assert_eq!(store.list_by_prefix("s/").await.unwrap(), vec!["s/video.mov"]);
    }

    #[tokio::test]
    async fn test_missing_prefix_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");
        assert!(store.list_by_prefix("nothing-here/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");
        let err = store
            .put("../outside.jpg", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
