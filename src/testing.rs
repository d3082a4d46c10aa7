//! In-memory doubles shared by the unit tests.

use crate::cache::Clock;
use crate::storage::{GatewayError, ListPage, ListRequest, ObjectStore};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Paginating fake bucket that counts the remote calls it receives
pub struct FakeStore {
    keys: Mutex<Vec<String>>,
    page_size: usize,
    fail_listing_on_call: Option<usize>,
    drop_tokens: bool,
    failing_signs: HashSet<String>,
    list_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: Mutex::new(keys),
            page_size: 1000,
            fail_listing_on_call: None,
            drop_tokens: false,
            failing_signs: HashSet::new(),
            list_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Make the n-th `list_page` call (1-based) fail
    pub fn fail_listing_on_call(mut self, call: usize) -> Self {
        self.fail_listing_on_call = Some(call);
        self
    }

    pub fn drop_continuation_tokens(mut self) -> Self {
        self.drop_tokens = true;
        self
    }

    pub fn fail_signing_for(mut self, key: &str) -> Self {
        self.failing_signs.insert(key.to_string());
        self
    }

    pub fn set_keys(&self, keys: Vec<String>) {
        *self.keys.lock().unwrap() = keys;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, GatewayError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        // Let concurrent callers interleave like a real round trip would
        tokio::task::yield_now().await;

        if self.fail_listing_on_call == Some(call) {
            return Err(GatewayError::Listing {
                bucket: request.bucket.clone(),
                prefix: request.prefix.clone().unwrap_or_default(),
                message: "access denied".to_string(),
            });
        }

        let prefix = request.prefix.as_deref().unwrap_or("");
        // (is_common_prefix, value)
        let mut entries: Vec<(bool, String)> = Vec::new();
        for key in self.keys.lock().unwrap().iter() {
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(delimiter) = request.delimiter.as_deref() {
                let rest = &key[prefix.len()..];
                if let Some(idx) = rest.find(delimiter) {
                    let common = format!("{}{}", prefix, &rest[..idx + delimiter.len()]);
                    if !entries.iter().any(|(is_prefix, v)| *is_prefix && *v == common) {
                        entries.push((true, common));
                    }
                    continue;
                }
            }
            entries.push((false, key.clone()));
        }

        let offset: usize = request
            .continuation_token
            .as_deref()
            .map(|token| token.parse().unwrap())
            .unwrap_or(0);
        let end = (offset + self.page_size).min(entries.len());
        let is_truncated = end < entries.len();

        let mut page = ListPage {
            is_truncated,
            next_token: (is_truncated && !self.drop_tokens).then(|| end.to_string()),
            ..Default::default()
        };
        for (is_prefix, value) in &entries[offset..end] {
            if *is_prefix {
                page.common_prefixes.push(value.clone());
            } else {
                page.keys.push(value.clone());
            }
        }
        Ok(page)
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, GatewayError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing_signs.contains(key) {
            return Err(GatewayError::Signing {
                key: key.to_string(),
                message: "no such key".to_string(),
            });
        }
        Ok(format!(
            "https://{}.example.invalid/{}?expires={}",
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
