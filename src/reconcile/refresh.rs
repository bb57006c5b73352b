use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use super::MergeOutcome;
use super::Reconciler;
use crate::async_task::with_timeout;
use crate::metrics::PARSE_FAILURES;
use crate::parse_event;
use crate::time::now_ts;
use crate::EndpointKey;
use crate::Event;
use crate::EventStatus;
use crate::EventTransport;
use crate::FabricCache;
use crate::ReconcileError;
use crate::Result;
use crate::SourceClass;

/// Parameters of one out-of-band refresh.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub overlay_vnid: u32,
    pub timeout: Duration,
}

impl Reconciler {
    /// Re-fetches the full state of `key` and merges it, synthesizing
    /// deletes for every node whose entry vanished.
    pub async fn refresh(
        &self,
        transport: &dyn EventTransport,
        cache: &mut FabricCache,
        key: &EndpointKey,
        trigger_ts: f64,
        options: RefreshOptions,
    ) -> Result<MergeOutcome> {
        let ledgers = self.history().read_latest(key, None, self.capacity())?;
        let oldest_ts = ledgers
            .iter()
            .filter_map(|l| l.oldest_ts())
            .fold(None, |acc: Option<f64>, ts| Some(acc.map_or(ts, |a| a.min(ts))));
        if let Some(oldest_ts) = oldest_ts {
            if trigger_ts < oldest_ts {
                return Err(ReconcileError::StaleTrigger {
                    key: key.clone(),
                    trigger_ts,
                    oldest_ts,
                }
                .into());
            }
        }
        let baseline: BTreeMap<u32, Event> = ledgers
            .iter()
            .filter_map(|l| l.current().map(|e| (l.node, e.clone())))
            .collect();

        let records = with_timeout(
            "refresh",
            options.timeout,
            transport.fetch_endpoint(key),
        )
        .await?;

        let mut fetched = Vec::with_capacity(records.len());
        for record in &records {
            match parse_event(record, &key.fabric, options.overlay_vnid) {
                Ok(event) if &event.key == key => fetched.push(event),
                Ok(_) => {}
                Err(e) => {
                    PARSE_FAILURES
                        .with_label_values(&[key.fabric.as_str(), record.class.as_str()])
                        .inc();
                    warn!("refresh of {} dropped record: {}", key, e);
                }
            }
        }
        for event in fetched.iter_mut() {
            cache.resolve_event(event)?;
        }

        let seen_plain: BTreeSet<u32> = fetched
            .iter()
            .filter(|e| e.class != SourceClass::RsIpEp)
            .map(|e| e.node)
            .collect();
        let seen_rewrite: BTreeSet<u32> = fetched
            .iter()
            .filter(|e| e.class == SourceClass::RsIpEp)
            .map(|e| e.node)
            .collect();

        let ts = now_ts();
        let plain_class = if key.is_ip() {
            SourceClass::IpEp
        } else {
            SourceClass::MacEp
        };
        for (node, current) in &baseline {
            if !seen_plain.contains(node) {
                debug!(key = %key, node, "synthesizing delete for vanished entry");
                fetched.push(Event::new(key.clone(), *node, ts, EventStatus::Deleted, plain_class));
            }
            if key.is_ip() && current.has_rewrite() && !seen_rewrite.contains(node) {
                fetched.push(Event::new(
                    key.clone(),
                    *node,
                    ts,
                    EventStatus::Deleted,
                    SourceClass::RsIpEp,
                ));
            }
        }

        // plain entries first so that rewrite-associations find a baseline
        fetched.sort_by_key(|e| e.class == SourceClass::RsIpEp);
        let mut outcome = MergeOutcome::UNCHANGED;
        for event in fetched {
            outcome = outcome | self.merge(event)?;
        }
        debug!(
            key = %key,
            updated = outcome.updated,
            analyze = outcome.analyze,
            "refresh complete"
        );
        Ok(outcome)
    }
}
