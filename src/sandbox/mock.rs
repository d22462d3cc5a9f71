//! Mock sandbox backend for testing.
//!
//! Hands out sequential sandbox ids and counts create/close calls without
//! touching any real backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{timeout_secs, CreateRequest, SandboxBackend, SandboxError, SandboxHandle};

/// A mock sandbox backend for testing.
///
/// Clones share counters, so a test can keep one clone for assertions after
/// handing another to the code under test.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockSandboxBackend {
    creates: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_create: Arc<AtomicBool>,
    fail_close: Arc<AtomicBool>,
    last_template: Arc<Mutex<Option<String>>>,
    last_timeout_secs: Arc<Mutex<Option<u64>>>,
}

impl MockSandboxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose `create` always fails.
    pub fn failing_create() -> Self {
        let mock = Self::new();
        mock.fail_create.store(true, Ordering::SeqCst);
        mock
    }

    /// Create a mock whose `close` always fails.
    pub fn failing_close() -> Self {
        let mock = Self::new();
        mock.fail_close.store(true, Ordering::SeqCst);
        mock
    }

    /// Toggles whether `create` fails.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Number of `create` calls, including failed ones.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `close` calls, including failed ones.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_template(&self) -> Option<String> {
        self.last_template.lock().unwrap().clone()
    }

    pub fn last_timeout_secs(&self) -> Option<u64> {
        *self.last_timeout_secs.lock().unwrap()
    }
}

#[async_trait]
impl SandboxBackend for MockSandboxBackend {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn create(&self, request: &CreateRequest<'_>) -> Result<SandboxHandle, SandboxError> {
        let count = self.creates.fetch_add(1, Ordering::SeqCst);
        *self.last_template.lock().unwrap() = Some(request.template.to_string());
        *self.last_timeout_secs.lock().unwrap() = Some(timeout_secs(request.timeout));

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SandboxError::api(503, "capacity exhausted"));
        }

        Ok(SandboxHandle::new(
            format!("mock-sbx-{}", count + 1),
            request.template,
            request.credential.cloned(),
        ))
    }

    async fn close(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);

        if self.fail_close.load(Ordering::SeqCst) {
            return Err(SandboxError::transport(format!(
                "connection reset while closing {}",
                handle.id()
            )));
        }
        Ok(())
    }
}
