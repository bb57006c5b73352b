use crate::ParseError;
use crate::Result;

/// Splits a dn on `/` outside of brackets.
pub fn split_dn(dn: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in dn.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&dn[start..]);
    segments
}

/// Value of a `prefix[value]` segment.
pub(crate) fn bracketed<'a>(
    segment: &'a str,
    prefix: &str,
) -> Option<&'a str> {
    segment.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')
}

/// Fields extracted from an endpoint dn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnFields {
    pub pod: Option<u32>,
    pub node: Option<u32>,
    pub vrf: Option<u32>,
    pub bd: Option<u32>,
    pub encap: Option<String>,
    pub mac: Option<String>,
    pub ip: Option<String>,
    /// Nested target of a rewrite-association
    pub rs_target: Option<String>,
}

fn vxlan(
    segment: &str,
    prefix: &str,
    field: &'static str,
) -> Result<Option<u32>> {
    match bracketed(segment, prefix) {
        None => Ok(None),
        Some(v) => v
            .strip_prefix("vxlan-")
            .and_then(|n| n.parse().ok())
            .map(Some)
            .ok_or_else(|| {
                ParseError::InvalidValue {
                    field,
                    value: v.to_string(),
                }
                .into()
            }),
    }
}

fn number(
    segment: &str,
    prefix: &str,
    field: &'static str,
) -> Result<Option<u32>> {
    match segment.strip_prefix(prefix) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            ParseError::InvalidValue {
                field,
                value: v.to_string(),
            }
            .into()
        }),
    }
}

/// Extracts every known field of an endpoint dn (or of the relative dn nested
/// in a rewrite-association). Unknown segments are ignored; the shape is
/// checked by the caller.
pub fn extract_fields(dn: &str) -> Result<DnFields> {
    let mut f = DnFields::default();
    for segment in split_dn(dn) {
        if let Some(v) = number(segment, "pod-", "pod")? {
            f.pod = Some(v);
        } else if let Some(v) = number(segment, "node-", "node")? {
            f.node = Some(v);
        } else if let Some(v) = vxlan(segment, "ctx-", "vrf")? {
            f.vrf = Some(v);
        } else if let Some(v) = vxlan(segment, "bd-", "bd")? {
            f.bd = Some(v);
        } else if let Some(v) = bracketed(segment, "vlan-") {
            f.encap = Some(v.to_string());
        } else if let Some(v) = bracketed(segment, "ip-") {
            f.ip = Some(v.to_string());
        } else if let Some(v) = bracketed(segment, "rsmacEpToIpEpAtt-") {
            f.rs_target = Some(v.to_string());
        } else if let Some(v) = segment.strip_prefix("mac-") {
            f.mac = Some(v.to_string());
        }
    }
    Ok(f)
}
