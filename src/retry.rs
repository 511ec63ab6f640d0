//! Retry-until-non-empty policy.
//!
//! The original flaky read operations (token refresh, ranking fetch)
//! signal failure by returning an empty value rather than an error, so
//! the retry unit is "call again while the result is empty". The policy
//! is a first-class value composed around the call site.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::sleep;

use crate::transport::RawResponse;

/// Failure predicate for retried results: an empty value means the call
/// failed and may be retried.
pub trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl<T> IsEmpty for Option<T> {
    fn is_empty(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl IsEmpty for bool {
    fn is_empty(&self) -> bool {
        !*self
    }
}

impl IsEmpty for String {
    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }
}

impl<K, V> IsEmpty for HashMap<K, V> {
    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }
}

impl<T> IsEmpty for HashSet<T> {
    fn is_empty(&self) -> bool {
        HashSet::is_empty(self)
    }
}

impl IsEmpty for RawResponse {
    /// A response without a status never left the transport.
    fn is_empty(&self) -> bool {
        self.status().is_none()
    }
}

/// Bounded retry with a fixed sleep between attempts.
///
/// `times` is the number of *retries*; the wrapped call runs at most
/// `times + 1` times. All attempts exhausted, the last (empty) result
/// is returned as-is, and the caller still branches on emptiness.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    times: u32,
    interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            times: 3,
            interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(times: u32, interval: Duration) -> Self {
        Self { times, interval }
    }

    /// Run `f` until it returns a non-empty value or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut f: F) -> T
    where
        T: IsEmpty,
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let mut result = f().await;
        for attempt in 1..=self.times {
            if !result.is_empty() {
                return result;
            }
            sleep(self.interval).await;
            tracing::warn!("{}: empty result, retry {}/{}", what, attempt, self.times);
            result = f().await;
        }

        if result.is_empty() {
            tracing::error!("{}: still empty after {} attempts", what, self.times + 1);
        }
        result
    }
}
