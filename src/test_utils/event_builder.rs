use crate::EndpointFlags;
use crate::EndpointKey;
use crate::Event;
use crate::EventStatus;
use crate::SourceClass;

pub const FABRIC: &str = "fab1";
pub const VRF: u32 = 2490368;
pub const BD: u32 = 15007730;
pub const MAC: &str = "00:50:56:AA:BB:CC";
pub const IP: &str = "10.1.1.101";

pub fn mac_key() -> EndpointKey {
    EndpointKey::mac(FABRIC, MAC, BD)
}

pub fn ip_key() -> EndpointKey {
    EndpointKey::ip(FABRIC, IP, VRF)
}

pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(
        key: EndpointKey,
        node: u32,
        ts: f64,
    ) -> Self {
        let class = if key.is_ip() {
            SourceClass::IpEp
        } else {
            SourceClass::MacEp
        };
        let mut event = Event::new(key, node, ts, EventStatus::Created, class);
        event.vrf = VRF;
        if !event.key.is_ip() {
            event.bd = event.key.vnid;
        }
        Self { event }
    }

    /// Local placement on `intf` with the default encap and pcTag.
    pub fn local(
        mut self,
        intf: &str,
    ) -> Self {
        self.event.flags.insert(EndpointFlags::LOCAL);
        self.event.intf_id = intf.to_string();
        self.event.intf_name = intf.to_string();
        self.event.encap = "vlan-110".to_string();
        self.event.pc_tag = "32770".to_string();
        self
    }

    /// XR entry pointing at `remote` through `tunnel`.
    pub fn remote(
        mut self,
        remote: u32,
        tunnel: &str,
    ) -> Self {
        self.event.flags.insert(EndpointFlags::REMOTE);
        self.event.intf_id = tunnel.to_string();
        self.event.intf_name = tunnel.to_string();
        self.event.remote = remote;
        self.event.pc_tag = "32770".to_string();
        self
    }

    pub fn status(
        mut self,
        status: EventStatus,
    ) -> Self {
        self.event.status = status;
        self
    }

    pub fn class(
        mut self,
        class: SourceClass,
    ) -> Self {
        self.event.class = class;
        self
    }

    pub fn flags(
        mut self,
        flags: EndpointFlags,
    ) -> Self {
        self.event.flags.insert(flags);
        self
    }

    pub fn rewrite(
        mut self,
        mac: &str,
        bd: u32,
    ) -> Self {
        self.event.rw_mac = mac.to_string();
        self.event.rw_bd = bd;
        self
    }

    pub fn intf_name(
        mut self,
        name: &str,
    ) -> Self {
        self.event.intf_name = name.to_string();
        self
    }

    pub fn encap(
        mut self,
        encap: &str,
    ) -> Self {
        self.event.encap = encap.to_string();
        self
    }

    pub fn pc_tag(
        mut self,
        pc_tag: &str,
    ) -> Self {
        self.event.pc_tag = pc_tag.to_string();
        self
    }

    pub fn node(
        mut self,
        node: u32,
    ) -> Self {
        self.event.node = node;
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}
