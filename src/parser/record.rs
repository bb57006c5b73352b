use std::collections::BTreeMap;

use crate::constants::CLASS_IP_EP;
use crate::constants::CLASS_MAC_EP;
use crate::constants::CLASS_RS_IP_EP;
use crate::ConfigClass;
use crate::ConfigObject;
use crate::EventStatus;
use crate::ParseError;
use crate::Result;

/// Attribute record as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub class: String,
    pub attrs: BTreeMap<String, String>,
    /// Observation time, epoch seconds
    pub ts: f64,
}

/// Routing decision for an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Endpoint,
    Config(ConfigClass),
    Unknown,
}

impl RawRecord {
    pub fn new(
        class: impl Into<String>,
        ts: f64,
    ) -> Self {
        Self {
            class: class.into(),
            attrs: BTreeMap::new(),
            ts,
        }
    }

    pub fn with_attr(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn kind(&self) -> RecordKind {
        match self.class.as_str() {
            CLASS_MAC_EP | CLASS_IP_EP | CLASS_RS_IP_EP => RecordKind::Endpoint,
            other => ConfigClass::from_class(other)
                .map(RecordKind::Config)
                .unwrap_or(RecordKind::Unknown),
        }
    }

    pub(crate) fn dn(&self) -> Result<&str> {
        self.attr("dn").filter(|d| !d.is_empty()).ok_or_else(|| {
            ParseError::MissingField {
                field: "dn",
                dn: String::new(),
            }
            .into()
        })
    }

    pub(crate) fn status(&self) -> Result<EventStatus> {
        let raw = self.attr("status");
        EventStatus::parse(raw).ok_or_else(|| {
            ParseError::InvalidValue {
                field: "status",
                value: raw.unwrap_or_default().to_string(),
            }
            .into()
        })
    }
}

/// Converts a configuration class record into a [`ConfigObject`].
pub fn parse_config(record: &RawRecord) -> Result<ConfigObject> {
    let class = ConfigClass::from_class(&record.class)
        .ok_or_else(|| ParseError::UnsupportedClass(record.class.clone()))?;
    let dn = record.dn()?.to_string();
    let status = record.status()?;
    let attrs = record
        .attrs
        .iter()
        .filter(|(k, _)| k.as_str() != "dn" && k.as_str() != "status")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(ConfigObject {
        class,
        dn,
        status,
        attrs,
        ts: record.ts,
    })
}
