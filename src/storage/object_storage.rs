//! Remote block store over S3-compatible object storage.
//!
//! Keys map to objects named `<prefix>/<hex key>`. The `object_store` API
//! is async, so the store owns a small current-thread runtime and blocks on
//! each request. Calls made from inside another tokio runtime step out of it
//! first, so the store can be used from async tasks too.

use crate::info;
use crate::storage::storage_trait::{BlockStore, BlockStoreError, check_key};
use crate::types::bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::mem::ManuallyDrop;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Object probed at construction to confirm the bucket is reachable.
const PROBE_OBJECT: &str = ".probe";

/// Connection options for the remote object store backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// Prefix prepended to every object name.
    pub prefix: String,
    /// Region; falls back to `AWS_REGION`, then `us-east-1`.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO and friends).
    pub endpoint: Option<String>,
    /// Access key; falls back to `AWS_ACCESS_KEY_ID`.
    pub access_key_id: Option<String>,
    /// Secret key; falls back to `AWS_SECRET_ACCESS_KEY`.
    pub secret_access_key: Option<String>,
    /// Allow plain HTTP endpoints.
    pub allow_http: bool,
}

fn unavailable(e: impl std::fmt::Display) -> BlockStoreError {
    BlockStoreError::BackendUnavailable(e.to_string())
}

/// Block store backed by a remote object store.
pub struct RemoteObjectStore {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    runtime: ManuallyDrop<Runtime>,
}

impl RemoteObjectStore {
    /// Connects to the bucket described by `config` and probes it.
    ///
    /// Fails with `BackendUnavailable` if the bucket cannot be reached.
    pub fn connect(config: &ObjectStoreConfig) -> Result<Self, BlockStoreError> {
        if config.bucket.is_empty() {
            return Err(BlockStoreError::InvalidArgument(
                "object store bucket is empty".into(),
            ));
        }

        let region = config
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string());

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(region)
            .with_allow_http(config.allow_http);

        if let Some(key_id) = config
            .access_key_id
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())
        {
            builder = builder.with_access_key_id(key_id);
        }
        if let Some(secret) = config
            .secret_access_key
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())
        {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }

        let store = builder.build().map_err(unavailable)?;
        let backend = Self::with_store(Arc::new(store), &config.prefix)?;
        backend.probe()?;

        info!(
            "Connected object block store to bucket {} prefix {:?}",
            config.bucket, config.prefix
        );
        Ok(backend)
    }

    /// Creates a store over a process-local in-memory bucket.
    pub fn in_memory(prefix: &str) -> Result<Self, BlockStoreError> {
        Self::with_store(Arc::new(InMemory::new()), prefix)
    }

    /// Wraps an existing `object_store` implementation.
    pub fn with_store(store: Arc<dyn ObjectStore>, prefix: &str) -> Result<Self, BlockStoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BlockStoreError::Io(e.to_string()))?;

        Ok(Self {
            store,
            prefix: ObjectPath::from(prefix.trim_matches('/')),
            runtime: ManuallyDrop::new(runtime),
        })
    }

    fn object_path(&self, key: &[u8]) -> ObjectPath {
        let name = hex::encode(key);
        if self.prefix.as_ref().is_empty() {
            ObjectPath::from(name)
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, name))
        }
    }

    /// Drives `future` to completion on the store's runtime.
    ///
    /// A runtime cannot be entered from a thread that is already running
    /// one. Multi-threaded callers hand their worker over with
    /// `block_in_place`; a current-thread caller has no worker to spare, so
    /// the request runs on a scoped helper thread instead.
    fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        match Handle::try_current().map(|h| h.runtime_flavor()) {
            Err(_) => self.runtime.block_on(future),
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| self.runtime.block_on(future))
            }
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.runtime.block_on(future))
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
        }
    }

    /// Issues one metadata request; a missing probe object still proves liveness.
    fn probe(&self) -> Result<(), BlockStoreError> {
        let path = if self.prefix.as_ref().is_empty() {
            ObjectPath::from(PROBE_OBJECT)
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, PROBE_OBJECT))
        };
        match self.block_on(self.store.head(&path)) {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(unavailable(e)),
        }
    }
}

impl Drop for RemoteObjectStore {
    fn drop(&mut self) {
        // SAFETY: the runtime is taken exactly once, here, and never used again.
        let runtime = unsafe { ManuallyDrop::take(&mut self.runtime) };
        // A plain drop blocks, which panics when the store dies inside an async task.
        runtime.shutdown_background();
    }
}

impl BlockStore for RemoteObjectStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError> {
        check_key(key)?;
        let path = self.object_path(key);
        let result = self.block_on(async {
            let response = self.store.get(&path).await?;
            response.bytes().await
        });

        match result {
            Ok(data) => Ok(Some(Bytes::new(data.to_vec()))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(unavailable(e)),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        let path = self.object_path(key);
        let payload = PutPayload::from(value.to_vec());
        self.block_on(self.store.put(&path, payload))
            .map(|_| ())
            .map_err(unavailable)
    }

    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError> {
        check_key(key)?;
        let path = self.object_path(key);
        match self.block_on(self.store.head(&path)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(unavailable(e)),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        let path = self.object_path(key);
        match self.block_on(self.store.delete(&path)) {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(unavailable(e)),
        }
    }
}
