//! Derivation functions, one per configuration class.
//!
//! Each function runs after the raw object was mirrored. For deletes the
//! object carries the last known attributes merged with the delete event.

use tracing::debug;
use tracing::warn;

use super::parent_dn;
use super::rn;
use super::tep_address;
use super::SyncContext;
use crate::parser::bracketed;
use crate::parser::split_dn;
use crate::split_vpc_node_id;
use crate::tunnel_key;
use crate::vpc_node_id;
use crate::ConfigClass;
use crate::ConfigObject;
use crate::EpgRecord;
use crate::FabricObject;
use crate::NodeRecord;
use crate::NodeState;
use crate::ObjectTable;
use crate::Result;
use crate::SubnetRecord;
use crate::TunnelRecord;
use crate::VnidKind;
use crate::VnidRecord;
use crate::VpcRecord;
use crate::UNRESOLVED;

// -
// helpers

/// Numeric value of the first `prefix<N>` segment of `dn`.
fn dn_number(
    dn: &str,
    prefix: &str,
) -> Option<u32> {
    split_dn(dn)
        .into_iter()
        .find_map(|s| s.strip_prefix(prefix).and_then(|n| n.parse().ok()))
}

/// Writes a derived record, as a reset when the reference became unresolved.
fn write_ref(
    ctx: &mut SyncContext<'_>,
    object: FabricObject,
    resolved: bool,
) -> Result<bool> {
    if resolved {
        ctx.upsert(object)
    } else {
        ctx.reset(object)
    }
}

fn bd_vnid_of(
    ctx: &SyncContext<'_>,
    bd_dn: &str,
) -> Result<u32> {
    if bd_dn.is_empty() {
        return Ok(UNRESOLVED);
    }
    Ok(ctx
        .mo(ConfigClass::FvBD, bd_dn)?
        .and_then(|bd| bd.attr_u32("seg"))
        .unwrap_or(UNRESOLVED))
}

/// Node id or vpc identity owning a TEP address.
fn resolve_dest(
    ctx: &SyncContext<'_>,
    dest: &str,
) -> Result<u32> {
    let dest = tep_address(dest);
    if dest.is_empty() {
        return Ok(UNRESOLVED);
    }
    if let Some(node) = ctx.nodes()?.into_iter().find(|n| n.address == dest) {
        return Ok(node.id);
    }
    let Some(gep) = ctx
        .mos(ConfigClass::FabricExplicitGEp)?
        .into_iter()
        .find(|g| g.attr("virtualIp").map(tep_address) == Some(dest))
    else {
        return Ok(UNRESOLVED);
    };
    let members = group_members(ctx, &gep.dn)?;
    Ok(match members.as_slice() {
        [a, b] => vpc_node_id(*a, *b),
        _ => UNRESOLVED,
    })
}

fn pep_id(pep: &ConfigObject) -> Option<u32> {
    pep.attr_u32("id").or_else(|| dn_number(&pep.dn, "nodepep-"))
}

/// Node ids of the protection endpoints below an explicit group.
fn group_members(
    ctx: &SyncContext<'_>,
    group_dn: &str,
) -> Result<Vec<u32>> {
    let prefix = format!("{group_dn}/");
    let mut members: Vec<u32> = ctx
        .mos(ConfigClass::FabricNodePEp)?
        .iter()
        .filter(|p| p.dn.starts_with(&prefix))
        .filter_map(pep_id)
        .collect();
    members.sort_unstable();
    members.dedup();
    Ok(members)
}

fn peer_of(
    ctx: &SyncContext<'_>,
    node: u32,
) -> Result<u32> {
    let Some(pep) = ctx
        .mos(ConfigClass::FabricNodePEp)?
        .into_iter()
        .find(|p| pep_id(p) == Some(node))
    else {
        return Ok(UNRESOLVED);
    };
    let members = group_members(ctx, &parent_dn(&pep.dn))?;
    Ok(members.into_iter().find(|m| *m != node).unwrap_or(UNRESOLVED))
}

fn set_peer(
    ctx: &mut SyncContext<'_>,
    node: u32,
    peer: u32,
) -> Result<()> {
    if let Some(mut record) = ctx.node(node)? {
        if record.peer != peer {
            record.peer = peer;
            write_ref(ctx, FabricObject::Node(record), peer != UNRESOLVED)?;
        }
    }
    Ok(())
}

/// Re-resolves every tunnel selected by `select`.
fn refresh_tunnels<F>(
    ctx: &mut SyncContext<'_>,
    select: F,
) -> Result<()>
where
    F: Fn(&TunnelRecord) -> bool,
{
    for mut tunnel in ctx.tunnels()?.into_iter().filter(|t| select(t)) {
        let remote = resolve_dest(ctx, &tunnel.dest)?;
        if remote != tunnel.remote {
            debug!(
                "tunnel {} on node {} now resolves to {}",
                tunnel.intf, tunnel.node, remote
            );
            tunnel.remote = remote;
            write_ref(ctx, FabricObject::Tunnel(tunnel), remote != UNRESOLVED)?;
        }
    }
    Ok(())
}

fn refresh_tunnels_to(
    ctx: &mut SyncContext<'_>,
    address: &str,
) -> Result<()> {
    let address = tep_address(address).to_string();
    if address.is_empty() {
        return Ok(());
    }
    refresh_tunnels(ctx, |t| tep_address(&t.dest) == address)
}

/// Tunnels towards a vpc group address, or currently bound to any vpc
/// identity whose membership may have changed.
fn refresh_vpc_tunnels(
    ctx: &mut SyncContext<'_>,
    virtual_ip: Option<&str>,
) -> Result<()> {
    let vip = virtual_ip.map(tep_address).unwrap_or_default().to_string();
    refresh_tunnels(ctx, |t| {
        (!vip.is_empty() && tep_address(&t.dest) == vip) || split_vpc_node_id(t.remote).is_some()
    })
}

fn set_subnets_vnid(
    ctx: &mut SyncContext<'_>,
    parent: &str,
    bd_vnid: u32,
) -> Result<()> {
    for mut subnet in ctx.subnets()?.into_iter().filter(|s| s.parent == parent) {
        if subnet.bd_vnid != bd_vnid {
            subnet.bd_vnid = bd_vnid;
            write_ref(ctx, FabricObject::Subnet(subnet), bd_vnid != UNRESOLVED)?;
        }
    }
    Ok(())
}

/// Points an EPG at `bd` and cascades the vnid into its subnets.
fn bind_epg(
    ctx: &mut SyncContext<'_>,
    mut epg: EpgRecord,
    bd: String,
    bd_vnid: u32,
) -> Result<()> {
    let name = epg.name.clone();
    if epg.bd != bd || epg.bd_vnid != bd_vnid {
        epg.bd = bd;
        epg.bd_vnid = bd_vnid;
        write_ref(ctx, FabricObject::Epg(epg), bd_vnid != UNRESOLVED)?;
    }
    set_subnets_vnid(ctx, &name, bd_vnid)
}

/// Target bd dn of an `fvRsBd` object.
fn rs_bd_target(rs: &ConfigObject) -> Option<String> {
    if let Some(tdn) = rs.attr("tDn") {
        return Some(tdn.to_string());
    }
    let name = rs.attr("tnFvBDName")?;
    let segments = split_dn(&rs.dn);
    let tenant = segments.iter().position(|s| s.starts_with("tn-"))?;
    Some(format!("{}/BD-{}", segments[..=tenant].join("/"), name))
}

// -
// rules

pub(super) fn fabric_node(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let Some(id) = mo.attr_u32("id").or_else(|| dn_number(&mo.dn, "node-")) else {
        warn!("fabricNode without id: {}", mo.dn);
        return Ok(());
    };
    let prior = ctx.node(id)?;

    if mo.is_deleted() {
        ctx.delete(ObjectTable::Node, &id.to_string())?;
        if let Some(prior) = prior {
            refresh_tunnels_to(ctx, &prior.address)?;
        }
        return Ok(());
    }

    let record = NodeRecord {
        id,
        name: mo.attr("name").unwrap_or_default().to_string(),
        address: mo.attr("address").map(tep_address).unwrap_or_default().to_string(),
        state: NodeState::parse(mo.attr("fabricSt")),
        peer: peer_of(ctx, id)?,
    };
    let address = record.address.clone();
    ctx.upsert(FabricObject::Node(record))?;
    if let Some(prior) = prior.filter(|p| p.address != address) {
        refresh_tunnels_to(ctx, &prior.address)?;
    }
    refresh_tunnels_to(ctx, &address)
}

pub(super) fn explicit_gep(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    refresh_vpc_tunnels(ctx, mo.attr("virtualIp"))
}

pub(super) fn node_pep(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let Some(id) = pep_id(mo) else {
        warn!("fabricNodePEp without id: {}", mo.dn);
        return Ok(());
    };
    let group = parent_dn(&mo.dn);
    let members = group_members(ctx, &group)?;

    if mo.is_deleted() {
        set_peer(ctx, id, UNRESOLVED)?;
        for other in members.iter().filter(|m| **m != id) {
            set_peer(ctx, *other, UNRESOLVED)?;
        }
    } else if let [a, b] = members.as_slice() {
        set_peer(ctx, *a, *b)?;
        set_peer(ctx, *b, *a)?;
    }

    let vip = ctx
        .mo(ConfigClass::FabricExplicitGEp, &group)?
        .and_then(|g| g.attr("virtualIp").map(str::to_string));
    refresh_vpc_tunnels(ctx, vip.as_deref())
}

pub(super) fn tunnel_if(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let node = dn_number(&mo.dn, "node-");
    let intf = mo
        .attr("id")
        .or_else(|| bracketed(rn(&mo.dn), "tunnel-"))
        .map(str::to_string);
    let (Some(node), Some(intf)) = (node, intf) else {
        warn!("tunnelIf without node or id: {}", mo.dn);
        return Ok(());
    };

    if mo.is_deleted() {
        ctx.delete(ObjectTable::Tunnel, &tunnel_key(node, &intf))?;
        return Ok(());
    }
    let dest = mo.attr("dest").unwrap_or_default().to_string();
    let remote = resolve_dest(ctx, &dest)?;
    ctx.upsert(FabricObject::Tunnel(TunnelRecord {
        node,
        intf,
        dest,
        remote,
    }))?;
    Ok(())
}

pub(super) fn vpc_conf(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let node = dn_number(&mo.dn, "node-");
    let vpc = dn_number(&mo.dn, "if-");
    let intf = mo.attr("tSKey").map(str::to_string);
    let (Some(node), Some(vpc), Some(intf)) = (node, vpc, intf) else {
        warn!("vpcRsVpcConf missing node, vpc or interface: {}", mo.dn);
        return Ok(());
    };

    if mo.is_deleted() {
        ctx.delete(ObjectTable::Vpc, &tunnel_key(node, &intf))?;
    } else {
        ctx.upsert(FabricObject::Vpc(VpcRecord { node, intf, vpc }))?;
    }
    Ok(())
}

fn sync_vnid(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
    attr: &str,
    kind: VnidKind,
) -> Result<Option<u32>> {
    let Some(vnid) = mo.attr_u32(attr) else {
        warn!("{} without {}: {}", mo.class, attr, mo.dn);
        return Ok(None);
    };
    if mo.is_deleted() {
        let owned = matches!(
            ctx.get(ObjectTable::Vnid, &vnid.to_string())?,
            Some(FabricObject::Vnid(v)) if v.name == mo.dn
        );
        if owned {
            ctx.delete(ObjectTable::Vnid, &vnid.to_string())?;
        }
    } else {
        ctx.upsert(FabricObject::Vnid(VnidRecord {
            vnid,
            name: mo.dn.clone(),
            kind,
        }))?;
    }
    Ok(Some(vnid))
}

pub(super) fn fv_ctx(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    sync_vnid(ctx, mo, "scope", VnidKind::Vrf)?;
    Ok(())
}

pub(super) fn fv_bd(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let seg = sync_vnid(ctx, mo, "seg", VnidKind::Bd)?;
    let bd_vnid = match (mo.is_deleted(), seg) {
        (false, Some(seg)) => seg,
        _ => UNRESOLVED,
    };

    for epg in ctx.epgs()?.into_iter().filter(|e| e.bd == mo.dn) {
        let bd = epg.bd.clone();
        bind_epg(ctx, epg, bd, bd_vnid)?;
    }
    set_subnets_vnid(ctx, &mo.dn, bd_vnid)
}

pub(super) fn fv_aepg(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    if mo.is_deleted() {
        ctx.delete(ObjectTable::Epg, &mo.dn)?;
        return set_subnets_vnid(ctx, &mo.dn, UNRESOLVED);
    }

    let bd = ctx
        .mo(ConfigClass::FvRsBd, &format!("{}/rsbd", mo.dn))?
        .and_then(|rs| rs_bd_target(&rs))
        .unwrap_or_default();
    let bd_vnid = bd_vnid_of(ctx, &bd)?;
    let epg = EpgRecord {
        name: mo.dn.clone(),
        vrf: mo.attr_u32("scope").unwrap_or(UNRESOLVED),
        pc_tag: mo.attr("pcTag").unwrap_or_default().to_string(),
        bd,
        bd_vnid,
    };
    ctx.upsert(FabricObject::Epg(epg))?;
    set_subnets_vnid(ctx, &mo.dn, bd_vnid)
}

pub(super) fn fv_rs_bd(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    let epg_dn = parent_dn(&mo.dn);
    let Some(epg) = ctx.epg(&epg_dn)? else {
        debug!("bd association for unknown epg {}", epg_dn);
        return Ok(());
    };
    let (bd, bd_vnid) = if mo.is_deleted() {
        (String::new(), UNRESOLVED)
    } else {
        let bd = rs_bd_target(mo).unwrap_or_default();
        let vnid = bd_vnid_of(ctx, &bd)?;
        (bd, vnid)
    };
    bind_epg(ctx, epg, bd, bd_vnid)
}

pub(super) fn fv_subnet(
    ctx: &mut SyncContext<'_>,
    mo: &ConfigObject,
) -> Result<()> {
    if mo.is_deleted() {
        ctx.delete(ObjectTable::Subnet, &mo.dn)?;
        return Ok(());
    }
    let Some(ip) = mo
        .attr("ip")
        .or_else(|| bracketed(rn(&mo.dn), "subnet-"))
        .map(str::to_string)
    else {
        warn!("fvSubnet without ip: {}", mo.dn);
        return Ok(());
    };

    let parent = parent_dn(&mo.dn);
    let bd_vnid = if ctx.mo(ConfigClass::FvBD, &parent)?.is_some() {
        bd_vnid_of(ctx, &parent)?
    } else {
        ctx.epg(&parent)?.map(|e| e.bd_vnid).unwrap_or(UNRESOLVED)
    };
    ctx.upsert(FabricObject::Subnet(SubnetRecord {
        name: mo.dn.clone(),
        ip,
        parent,
        bd_vnid,
    }))?;
    Ok(())
}
