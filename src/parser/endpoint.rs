use tracing::trace;

use super::extract_fields;
use super::split_dn;
use super::DnFields;
use super::RawRecord;
use crate::EndpointFlags;
use crate::EndpointKey;
use crate::Event;
use crate::EventStatus;
use crate::ParseError;
use crate::Result;
use crate::SourceClass;

/// Parses one endpoint record.
///
/// `overlay_vnid` is the infra vrf; endpoints learned there are tunnel
/// endpoints of the fabric itself and are rejected.
pub fn parse_event(
    record: &RawRecord,
    fabric: &str,
    overlay_vnid: u32,
) -> Result<Event> {
    let class = SourceClass::from_class(&record.class)
        .ok_or_else(|| ParseError::UnsupportedClass(record.class.clone()))?;
    let dn = record.dn()?;
    let status = record.status()?;

    let segments = split_dn(dn);
    if segments.len() < 4 || segments[0] != "topology" || segments[3] != "sys" {
        return Err(ParseError::UnrecognizedDn(dn.to_string()).into());
    }
    let fields = extract_fields(dn)?;
    let node = required(fields.node, "node", dn)?;

    let mut event = match class {
        SourceClass::MacEp => mac_event(&fields, fabric, dn, node)?,
        SourceClass::IpEp => ip_event(&fields, fabric, dn, node)?,
        SourceClass::RsIpEp => rs_event(&fields, fabric, dn, node)?,
    };
    if event.vrf == overlay_vnid {
        return Err(ParseError::OverlayEndpoint { dn: dn.to_string() }.into());
    }

    event.ts = record.ts;
    event.status = status;
    event.dn = dn.to_string();
    if class != SourceClass::RsIpEp {
        apply_attributes(&mut event, record);
    }
    trace!("parsed {}", event);
    Ok(event)
}

fn required<T>(
    v: Option<T>,
    field: &'static str,
    dn: &str,
) -> Result<T> {
    v.ok_or_else(|| {
        ParseError::MissingField {
            field,
            dn: dn.to_string(),
        }
        .into()
    })
}

fn base_event(
    key: EndpointKey,
    node: u32,
    class: SourceClass,
    fields: &DnFields,
) -> Event {
    let mut e = Event::new(key, node, 0.0, EventStatus::Created, class);
    e.vrf = fields.vrf.unwrap_or_default();
    e.bd = fields.bd.unwrap_or_default();
    e.encap = fields.encap.clone().unwrap_or_default();
    e
}

fn mac_event(
    fields: &DnFields,
    fabric: &str,
    dn: &str,
    node: u32,
) -> Result<Event> {
    if fields.ip.is_some() || fields.rs_target.is_some() {
        return Err(ParseError::UnrecognizedDn(dn.to_string()).into());
    }
    let mac = required(fields.mac.as_deref(), "mac", dn)?;
    let bd = required(fields.bd, "bd", dn)?;
    required(fields.vrf, "vrf", dn)?;
    Ok(base_event(
        EndpointKey::mac(fabric, mac, bd),
        node,
        SourceClass::MacEp,
        fields,
    ))
}

fn ip_event(
    fields: &DnFields,
    fabric: &str,
    dn: &str,
    node: u32,
) -> Result<Event> {
    if fields.mac.is_some() || fields.rs_target.is_some() {
        return Err(ParseError::UnrecognizedDn(dn.to_string()).into());
    }
    let ip = required(fields.ip.as_deref(), "ip", dn)?;
    let vrf = required(fields.vrf, "vrf", dn)?;
    Ok(base_event(
        EndpointKey::ip(fabric, ip, vrf),
        node,
        SourceClass::IpEp,
        fields,
    ))
}

/// The rewrite-association lives under the mac entry and names the ip entry
/// it binds; the key is the ip, the outer mac and bd are the rewrite info.
fn rs_event(
    fields: &DnFields,
    fabric: &str,
    dn: &str,
    node: u32,
) -> Result<Event> {
    let target = required(fields.rs_target.as_deref(), "rsmacEpToIpEpAtt", dn)?;
    let mac = required(fields.mac.as_deref(), "mac", dn)?;
    let rw_bd = required(fields.bd, "bd", dn)?;

    let inner = extract_fields(target)?;
    let ip = required(inner.ip.as_deref(), "ip", dn)?;
    let vrf = required(inner.vrf.or(fields.vrf), "vrf", dn)?;

    let mut e = base_event(
        EndpointKey::ip(fabric, ip, vrf),
        node,
        SourceClass::RsIpEp,
        &inner,
    );
    e.vrf = vrf;
    e.rw_mac = crate::normalize_mac(mac);
    e.rw_bd = rw_bd;
    Ok(e)
}

fn apply_attributes(
    event: &mut Event,
    record: &RawRecord,
) {
    if let Some(flags) = record.attr("flags") {
        event.flags = EndpointFlags::parse(flags);
    }
    if let Some(intf) = record.attr("ifId") {
        event.intf_id = intf.to_string();
        event.intf_name = intf.to_string();
    }
    if let Some(pc_tag) = record.attr("pcTag") {
        event.pc_tag = pc_tag.to_string();
    }
    if record.attr("flags").is_some() && !event.is_local() && event.intf_id.starts_with("tunnel") {
        event.flags.insert(EndpointFlags::REMOTE);
    }
}
