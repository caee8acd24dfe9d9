//! Upload echo
//!
//! Persists both files of an [`UploadPair`] under generated keys, reads
//! them back as UTF-8 text and pairs each name with its decoded content.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::storage::StorageBackend;
use crate::types::{EchoResult, UploadMetadata, UploadPair, UploadedFile};
use crate::{Error, Result};

/// Key prefix for uploaded blobs and their metadata
pub const UPLOAD_PREFIX: &str = "uploads";

/// Upload echo settings
#[derive(Debug, Clone)]
pub struct EchoConfig {
    /// Upper bound for each storage round trip
    pub io_timeout: Duration,
    /// Keep files on disk after the response is built
    pub retain: bool,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(30),
            retain: true,
        }
    }
}

/// A file written to storage
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub key: String,
    pub name: String,
    pub size: usize,
}

impl StoredUpload {
    fn metadata_key(&self) -> String {
        format!("{}.json", self.key)
    }
}

pub struct EchoService {
    storage: Arc<dyn StorageBackend>,
    config: EchoConfig,
}

impl EchoService {
    pub fn new(storage: Arc<dyn StorageBackend>, config: EchoConfig) -> Self {
        Self { storage, config }
    }

    /// Write both files, then read both back in receive order
    pub async fn echo(&self, pair: UploadPair) -> Result<EchoResult> {
        let mut written = Vec::with_capacity(2);
        let result = self.round_trip(pair, &mut written).await;

        // Anything that was attempted is removed, whichever step failed
        if !self.config.retain {
            for stored in &written {
                self.remove(stored).await;
            }
        }

        result
    }

    async fn round_trip(
        &self,
        pair: UploadPair,
        written: &mut Vec<StoredUpload>,
    ) -> Result<EchoResult> {
        let UploadPair { corpus, queries } = pair;

        let first = self.store(corpus, written).await?;
        let second = self.store(queries, written).await?;

        let filecontent1 = self.read_text(&first).await?;
        let filecontent2 = self.read_text(&second).await?;

        tracing::info!(
            filename1 = %first.name,
            filename2 = %second.name,
            size1 = first.size,
            size2 = second.size,
            "Echoed upload pair"
        );

        Ok(EchoResult {
            filename1: first.name,
            filename2: second.name,
            filecontent1,
            filecontent2,
        })
    }

    /// Number of uploads currently held in storage
    pub async fn stored_count(&self) -> Result<usize> {
        let keys = self.storage.list(UPLOAD_PREFIX).await?;
        Ok(keys.iter().filter(|k| !k.ends_with(".json")).count())
    }

    /// The upload is recorded in `written` before the first put so a
    /// partial write can still be cleaned up.
    async fn store(
        &self,
        file: UploadedFile,
        written: &mut Vec<StoredUpload>,
    ) -> Result<StoredUpload> {
        let stored = StoredUpload {
            key: format!("{}/{}", UPLOAD_PREFIX, Uuid::new_v4()),
            name: file.name,
            size: file.bytes.len(),
        };

        let metadata = UploadMetadata {
            name: stored.name.clone(),
            size: stored.size,
            uploaded_at: Utc::now(),
        };
        let metadata = Bytes::from(serde_json::to_vec(&metadata)?);

        written.push(stored.clone());
        self.bounded(self.storage.put(&stored.key, file.bytes))
            .await?;
        self.bounded(self.storage.put(&stored.metadata_key(), metadata))
            .await?;

        tracing::debug!(key = %stored.key, name = %stored.name, size = stored.size, "Stored upload");

        Ok(stored)
    }

    async fn read_text(&self, stored: &StoredUpload) -> Result<String> {
        let bytes = self.bounded(self.storage.get(&stored.key)).await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidEncoding {
            name: stored.name.clone(),
        })
    }

    async fn remove(&self, stored: &StoredUpload) {
        for key in [stored.key.clone(), stored.metadata_key()] {
            if let Err(err) = self.bounded(self.storage.delete(&key)).await {
                tracing::warn!(key = %key, error = %err, "Failed to remove upload");
            }
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.io_timeout, op)
            .await
            .map_err(|_| Error::Timeout(self.config.io_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::LocalStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir, retain: bool) -> (EchoService, Arc<LocalStorage>) {
        let storage = Arc::new(LocalStorage::new(temp_dir.path()).unwrap());
        let config = EchoConfig {
            retain,
            ..EchoConfig::default()
        };
        (EchoService::new(storage.clone(), config), storage)
    }

    fn pair(a: (&str, &[u8]), b: (&str, &[u8])) -> UploadPair {
        UploadPair {
            corpus: UploadedFile::new(a.0, a.1.to_vec()),
            queries: UploadedFile::new(b.0, b.1.to_vec()),
        }
    }

    #[tokio::test]
    async fn test_echo_pair() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, true);

        let result = service
            .echo(pair(("a.txt", b"hello"), ("b.txt", b"world")))
            .await
            .unwrap();

        assert_eq!(
            result,
            EchoResult {
                filename1: "a.txt".to_string(),
                filename2: "b.txt".to_string(),
                filecontent1: "hello".to_string(),
                filecontent2: "world".to_string(),
            }
        );
        assert_eq!(service.stored_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_content_is_not_normalized() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, true);

        let text = "  line one\r\nline two\n\tü ✓ \n\n";
        let result = service
            .echo(pair(("a.txt", text.as_bytes()), ("empty.txt", b"")))
            .await
            .unwrap();

        assert_eq!(result.filecontent1, text);
        assert_eq!(result.filecontent2, "");
    }

    #[tokio::test]
    async fn test_same_name_twice_keeps_both() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, true);

        let result = service
            .echo(pair(("same.txt", b"first"), ("same.txt", b"second")))
            .await
            .unwrap();

        assert_eq!(result.filecontent1, "first");
        assert_eq!(result.filecontent2, "second");
        assert_eq!(service.stored_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_names_offending_file() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, true);

        let err = service
            .echo(pair(("a.txt", b"fine"), ("image.png", &[0x89, 0x50, 0xff, 0xfe])))
            .await
            .unwrap_err();

        match err {
            Error::InvalidEncoding { name } => assert_eq!(name, "image.png"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_traversal_name_stays_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        let storage = Arc::new(LocalStorage::new(&root).unwrap());
        let service = EchoService::new(storage.clone(), EchoConfig::default());

        let result = service
            .echo(pair(("../../escape.txt", b"payload"), ("b.txt", b"x")))
            .await
            .unwrap();

        assert_eq!(result.filename1, "../../escape.txt");
        assert!(!temp_dir.path().join("escape.txt").exists());

        let keys = storage.list(UPLOAD_PREFIX).await.unwrap();
        let meta_key = keys.iter().find(|k| k.ends_with(".json")).unwrap();
        let raw = storage.get(meta_key).await.unwrap();
        let metadata: UploadMetadata = serde_json::from_slice(&raw).unwrap();
        assert!(["../../escape.txt", "b.txt"].contains(&metadata.name.as_str()));
    }

    #[tokio::test]
    async fn test_no_retain_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let (service, storage) = service(&temp_dir, false);

        service
            .echo(pair(("a.txt", b"hello"), ("b.txt", b"world")))
            .await
            .unwrap();
        assert!(storage.list(UPLOAD_PREFIX).await.unwrap().is_empty());

        // Cleanup also runs when decoding fails
        service
            .echo(pair(("a.txt", b"hello"), ("b.bin", &[0xff])))
            .await
            .unwrap_err();
        assert!(storage.list(UPLOAD_PREFIX).await.unwrap().is_empty());
    }

    struct StalledStorage;

    #[async_trait]
    impl StorageBackend for StalledStorage {
        async fn get(&self, _key: &str) -> Result<Bytes> {
            std::future::pending().await
        }

        async fn put(&self, _key: &str, _data: Bytes) -> Result<()> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }

        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn location(&self) -> String {
            "stalled".to_string()
        }
    }

    #[tokio::test]
    async fn test_stalled_storage_times_out() {
        let service = EchoService::new(
            Arc::new(StalledStorage),
            EchoConfig {
                io_timeout: Duration::from_millis(20),
                retain: true,
            },
        );

        let err = service
            .echo(pair(("a.txt", b"hello"), ("b.txt", b"world")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    /// Local storage whose n-th put (1-based) fails
    struct FailingPut {
        inner: LocalStorage,
        fail_on: usize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl StorageBackend for FailingPut {
        async fn get(&self, key: &str) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, data: Bytes) -> Result<()> {
            if self.puts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(Error::storage("disk full"));
            }
            self.inner.put(key, data).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.list(prefix).await
        }

        fn location(&self) -> String {
            self.inner.location()
        }
    }

    #[tokio::test]
    async fn test_no_retain_cleans_up_after_failed_write() {
        // Puts run blob, sidecar, blob, sidecar
        for fail_on in 1..=4 {
            let temp_dir = TempDir::new().unwrap();
            let storage = Arc::new(FailingPut {
                inner: LocalStorage::new(temp_dir.path()).unwrap(),
                fail_on,
                puts: AtomicUsize::new(0),
            });
            let service = EchoService::new(
                storage.clone(),
                EchoConfig {
                    retain: false,
                    ..EchoConfig::default()
                },
            );

            let err = service
                .echo(pair(("a.txt", b"hello"), ("b.txt", b"world")))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Storage(_)), "put #{fail_on}: {err:?}");
            assert!(
                storage.list(UPLOAD_PREFIX).await.unwrap().is_empty(),
                "put #{fail_on} left files behind"
            );
        }
    }

    #[tokio::test]
    async fn test_retain_keeps_completed_writes_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FailingPut {
            inner: LocalStorage::new(temp_dir.path()).unwrap(),
            fail_on: 3,
            puts: AtomicUsize::new(0),
        });
        let service = EchoService::new(storage.clone(), EchoConfig::default());

        service
            .echo(pair(("a.txt", b"hello"), ("b.txt", b"world")))
            .await
            .unwrap_err();
        assert_eq!(service.stored_count().await.unwrap(), 1);
    }
}
