//! A round-robin pool of Forge credentials.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::warn;

use bumpbench_util::errors::BumpbenchError;

use crate::client::ForgeClient;
use crate::config::Credential;

/// Abuse-limit back-off: a fixed sleep before the call is retried.
pub const ABUSE_BACKOFF: Duration = Duration::from_secs(10);

/// Rate-limit cutoff: once the remaining call budget drops below this, the
/// caller sleeps until the reset instant the Forge reports.
pub const RATE_LIMIT_CUTOFF: u32 = 5;

/// Single-reader FIFO: `acquire` dequeues, hands out, and re-enqueues at the
/// back, so the least-recently-used credential is always handed out next.
pub struct TokenPool {
    queue: Mutex<VecDeque<Credential>>,
}

impl TokenPool {
    /// Probe each credential against the Forge and admit only the ones it
    /// accepts. Fails if zero remain.
    pub async fn new(client: &ForgeClient, tokens: Vec<Credential>) -> Result<Self, BumpbenchError> {
        let mut admitted = VecDeque::new();
        for token in tokens {
            if client.validate_credential(&token).await {
                admitted.push_back(token);
            } else {
                warn!("token pool: dropping a credential the Forge rejected");
            }
        }
        if admitted.is_empty() {
            return Err(BumpbenchError::Config {
                message: "no valid Forge credentials remain after validation".to_string(),
            });
        }
        Ok(Self {
            queue: Mutex::new(admitted),
        })
    }

    /// Build a pool from already-validated credentials, for tests and fakes.
    pub fn from_validated(tokens: Vec<Credential>) -> Result<Self, BumpbenchError> {
        if tokens.is_empty() {
            return Err(BumpbenchError::Config {
                message: "no valid Forge credentials remain after validation".to_string(),
            });
        }
        Ok(Self {
            queue: Mutex::new(tokens.into_iter().collect()),
        })
    }

    /// Hand out the least-recently-used credential, rotating it to the
    /// back of the queue. Never blocks.
    pub fn acquire(&self) -> Credential {
        let mut queue = self.queue.lock().expect("token pool mutex poisoned");
        let token = queue.pop_front().expect("pool constructed non-empty");
        queue.push_back(token.clone());
        token
    }

    pub fn size(&self) -> usize {
        self.queue.lock().expect("token pool mutex poisoned").len()
    }
}
