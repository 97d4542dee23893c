// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request cancellation.
//
// The host cancels a request (client disconnect, shutdown) through a
// `CancelToken`. Strategies poll it between steps, and long waits race
// against `cancelled()` so child processes and OCR calls are abandoned
// promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use docshift_core::ConversionError;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation flag shared between the host and one request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<(), ConversionError> {
        if self.is_cancelled() {
            Err(ConversionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token fires; immediately if it already has.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent `cancel()`
            // cannot slip between the check and the wait.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
