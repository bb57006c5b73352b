use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::Entity;
use crate::HelloReply;
use crate::LivenessError;
use crate::Result;

/// Last hello echo per supervised entity.
#[derive(Debug)]
pub struct LivenessMonitor {
    last_seen: BTreeMap<Entity, Instant>,
    timeout: Duration,
}

impl LivenessMonitor {
    /// Every entity starts as seen at `now`.
    pub fn new(
        entities: impl IntoIterator<Item = Entity>,
        timeout: Duration,
        now: Instant,
    ) -> Self {
        Self {
            last_seen: entities.into_iter().map(|e| (e, now)).collect(),
            timeout,
        }
    }

    pub fn record(
        &mut self,
        reply: &HelloReply,
        now: Instant,
    ) {
        trace!("hello {} from {}", reply.seq, reply.entity);
        self.last_seen.insert(reply.entity, now);
    }

    /// Fails on the first entity whose last echo is older than the timeout.
    pub fn check(
        &self,
        now: Instant,
    ) -> Result<()> {
        for (entity, seen) in &self.last_seen {
            let elapsed = now.saturating_duration_since(*seen);
            if elapsed > self.timeout {
                return Err(LivenessError::Timeout {
                    entity: entity.to_string(),
                    elapsed,
                }
                .into());
            }
        }
        Ok(())
    }
}
