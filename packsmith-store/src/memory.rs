//! In-process artifact store.
//!
//! Records every call so tests can assert on upload decisions. Also usable
//! for local runs without object storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    public_root: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    put_calls: Mutex<Vec<String>>,
    exists_calls: AtomicUsize,
    failing_checks: AtomicUsize,
    deny_checks: AtomicBool,
    fail_puts: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new(public_root: impl Into<String>) -> Self {
        Self {
            public_root: public_root.into(),
            ..Default::default()
        }
    }

    /// Primes the store with an existing object.
    pub async fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().await.insert(name.into(), bytes);
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Names passed to `put`, in call order.
    pub fn put_calls(&self) -> Vec<String> {
        self.put_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Makes the next `n` existence checks fail with a transport error.
    pub fn fail_next_checks(&self, n: usize) {
        self.failing_checks.store(n, Ordering::SeqCst);
    }

    /// Makes every existence check fail with a non-transient error while set.
    pub fn deny_checks(&self, deny: bool) {
        self.deny_checks.store(deny, Ordering::SeqCst);
    }

    /// Makes every `put` fail while set.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn public_root(&self) -> &str {
        &self.public_root
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_checks.load(Ordering::SeqCst) {
            return Err(StoreError::Denied(format!("HeadObject {name}")));
        }
        let failing = self
            .failing_checks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable(format!("existence check for {name} failed")));
        }
        Ok(self.objects.read().await.contains_key(name))
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, _content_type: &str) -> StoreResult<()> {
        if let Ok(mut calls) = self.put_calls.lock() {
            calls.push(name.to_string());
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of {name} failed")));
        }
        self.objects.write().await.insert(name.to_string(), bytes);
        Ok(())
    }
}
