//! Bounded, cancellable status polling.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Attempt budget and sleep interval of one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub max_attempts: u32,
    #[serde(with = "secs")]
    pub interval: Duration,
}

impl PollConfig {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Newly created subnet becoming usable
    pub const fn subnet_ready() -> Self {
        Self::new(20, Duration::from_secs(5))
    }

    /// Node pool disappearing after a delete
    pub const fn node_pool_delete() -> Self {
        Self::new(30, Duration::from_secs(10))
    }

    /// Cluster reaching a target status; creation takes several minutes
    pub const fn cluster_create() -> Self {
        Self::new(360, Duration::from_secs(5))
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Calls `fetch` until `done` accepts its output, sleeping `config.interval`
/// between attempts.
///
/// Errors from `fetch` end the loop immediately. Running out of attempts
/// yields [`Error::Timeout`] and cancelling `cancel` during a sleep yields
/// [`Error::Cancelled`].
pub async fn poll_until<T, F, Fut, P>(
    config: PollConfig,
    what: &str,
    cancel: &CancellationToken,
    mut fetch: F,
    mut done: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&T) -> bool,
{
    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(what.to_owned()));
        }
        let value = fetch().await?;
        if done(&value) {
            debug!(what, attempt, "poll finished");
            return Ok(value);
        }
        trace!(what, attempt, max = config.max_attempts, "still waiting");
        if attempt == config.max_attempts {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled(what.to_owned())),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
    Err(Error::Timeout {
        what: what.to_owned(),
        attempts: config.max_attempts,
    })
}
