use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::parser::split_dn;
use crate::AddrType;
use crate::EndpointKey;
use crate::Event;
use crate::Result;

/// One clear command for a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearRequest {
    pub node: u32,
    pub addr_type: AddrType,
    /// `tenant:vrf` for ip endpoints, the vlan number for mac endpoints
    pub vrf_or_vlan: String,
    pub addr: String,
}

impl ClearRequest {
    /// Builds the clear command for the entry `event` on its node. `None`
    /// when the entry lacks the vrf name or encap needed to address it.
    pub fn for_event(
        key: &EndpointKey,
        event: &Event,
    ) -> Option<Self> {
        let vrf_or_vlan = if key.is_ip() {
            vrf_name(&event.vnid_name)?
        } else {
            event
                .encap
                .strip_prefix("vlan-")
                .filter(|v| v.parse::<u16>().is_ok())?
                .to_string()
        };
        Some(Self {
            node: event.node,
            addr_type: key.addr_type,
            vrf_or_vlan,
            addr: key.addr.clone(),
        })
    }
}

/// `uni/tn-t1/ctx-v1` to `t1:v1`.
fn vrf_name(dn: &str) -> Option<String> {
    let segments = split_dn(dn);
    let tenant = segments.iter().find_map(|s| s.strip_prefix("tn-"))?;
    let vrf = segments.iter().find_map(|s| s.strip_prefix("ctx-"))?;
    Some(format!("{tenant}:{vrf}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub success: bool,
    pub detail: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemediationExecutor: Send + Sync + 'static {
    async fn clear(
        &self,
        request: ClearRequest,
    ) -> Result<RemediationOutcome>;
}

/// Reports what would be cleared without touching the fabric.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRemediation;

#[async_trait]
impl RemediationExecutor for LogRemediation {
    async fn clear(
        &self,
        request: ClearRequest,
    ) -> Result<RemediationOutcome> {
        info!(
            node = request.node,
            addr_type = %request.addr_type,
            "would clear {} in {}",
            request.addr,
            request.vrf_or_vlan
        );
        Ok(RemediationOutcome {
            success: true,
            detail: format!(
                "dry-run: clear {} {} {} on node {}",
                request.addr_type, request.vrf_or_vlan, request.addr, request.node
            ),
        })
    }
}
