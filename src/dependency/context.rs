use crate::parser::split_dn;
use crate::ConfigClass;
use crate::ConfigObject;
use crate::DerivedObject;
use crate::EpgRecord;
use crate::FabricObject;
use crate::NodeRecord;
use crate::ObjectStore;
use crate::ObjectTable;
use crate::Result;
use crate::SubnetRecord;
use crate::TunnelRecord;

/// Store access for one sync, recording every mutation it performs.
pub struct SyncContext<'a> {
    pub fabric: &'a str,
    objects: &'a dyn ObjectStore,
    changes: Vec<DerivedObject>,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        fabric: &'a str,
        objects: &'a dyn ObjectStore,
    ) -> Self {
        Self {
            fabric,
            objects,
            changes: Vec::new(),
        }
    }

    pub fn into_changes(self) -> Vec<DerivedObject> {
        self.changes
    }

    pub fn get(
        &self,
        table: ObjectTable,
        name: &str,
    ) -> Result<Option<FabricObject>> {
        self.objects.get_object(self.fabric, table, name)
    }

    pub fn list(
        &self,
        table: ObjectTable,
    ) -> Result<Vec<FabricObject>> {
        self.objects.list_objects(self.fabric, table)
    }

    /// Writes `object` unless the stored value is identical.
    pub fn upsert(
        &mut self,
        object: FabricObject,
    ) -> Result<bool> {
        self.write(object, false)
    }

    /// Writes `object` as a reset of a dependent reference.
    pub fn reset(
        &mut self,
        object: FabricObject,
    ) -> Result<bool> {
        self.write(object, true)
    }

    fn write(
        &mut self,
        object: FabricObject,
        reset: bool,
    ) -> Result<bool> {
        let table = object.table();
        if self.get(table, &object.name())?.as_ref() == Some(&object) {
            return Ok(false);
        }
        self.objects.bulk_upsert(self.fabric, table, vec![object.clone()])?;
        self.changes.push(if reset {
            DerivedObject::reset(object)
        } else {
            DerivedObject::upserted(object)
        });
        Ok(true)
    }

    pub fn delete(
        &mut self,
        table: ObjectTable,
        name: &str,
    ) -> Result<bool> {
        let removed = self.objects.delete_objects(self.fabric, table, &[name.to_string()])?;
        if removed > 0 {
            self.changes.push(DerivedObject::deleted(table, name.to_string()));
        }
        Ok(removed > 0)
    }

    // -
    // typed accessors

    pub fn mo(
        &self,
        class: ConfigClass,
        dn: &str,
    ) -> Result<Option<ConfigObject>> {
        Ok(match self.get(ObjectTable::Mo(class), dn)? {
            Some(FabricObject::Mo(mo)) => Some(mo),
            _ => None,
        })
    }

    pub fn mos(
        &self,
        class: ConfigClass,
    ) -> Result<Vec<ConfigObject>> {
        Ok(self
            .list(ObjectTable::Mo(class))?
            .into_iter()
            .filter_map(|o| match o {
                FabricObject::Mo(mo) => Some(mo),
                _ => None,
            })
            .collect())
    }

    pub fn node(
        &self,
        id: u32,
    ) -> Result<Option<NodeRecord>> {
        Ok(match self.get(ObjectTable::Node, &id.to_string())? {
            Some(FabricObject::Node(n)) => Some(n),
            _ => None,
        })
    }

    pub fn nodes(&self) -> Result<Vec<NodeRecord>> {
        Ok(self
            .list(ObjectTable::Node)?
            .into_iter()
            .filter_map(|o| match o {
                FabricObject::Node(n) => Some(n),
                _ => None,
            })
            .collect())
    }

    pub fn tunnels(&self) -> Result<Vec<TunnelRecord>> {
        Ok(self
            .list(ObjectTable::Tunnel)?
            .into_iter()
            .filter_map(|o| match o {
                FabricObject::Tunnel(t) => Some(t),
                _ => None,
            })
            .collect())
    }

    pub fn epg(
        &self,
        dn: &str,
    ) -> Result<Option<EpgRecord>> {
        Ok(match self.get(ObjectTable::Epg, dn)? {
            Some(FabricObject::Epg(e)) => Some(e),
            _ => None,
        })
    }

    pub fn epgs(&self) -> Result<Vec<EpgRecord>> {
        Ok(self
            .list(ObjectTable::Epg)?
            .into_iter()
            .filter_map(|o| match o {
                FabricObject::Epg(e) => Some(e),
                _ => None,
            })
            .collect())
    }

    pub fn subnets(&self) -> Result<Vec<SubnetRecord>> {
        Ok(self
            .list(ObjectTable::Subnet)?
            .into_iter()
            .filter_map(|o| match o {
                FabricObject::Subnet(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

/// dn of the parent object.
pub fn parent_dn(dn: &str) -> String {
    let segments = split_dn(dn);
    segments[..segments.len().saturating_sub(1)].join("/")
}

/// Last dn segment.
pub fn rn(dn: &str) -> &str {
    split_dn(dn).last().copied().unwrap_or(dn)
}

/// TEP address without its host prefix length.
pub fn tep_address(raw: &str) -> &str {
    raw.split('/').next().unwrap_or(raw).trim()
}
