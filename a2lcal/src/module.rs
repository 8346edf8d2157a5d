use fnv::FnvHashMap;

use crate::specification::{
    A2lObjectName, AxisPts, Blob, Characteristic, CompuTab, CompuVtab, CompuVtabRange, Instance,
    Measurement,
};
use crate::{A2lError, Module};

/// An item of the object name space of a module
///
/// `CHARACTERISTIC`, `MEASUREMENT`, `AXIS_PTS`, `BLOB` and `INSTANCE` share one name space:
/// a name may only be used once across all of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModuleObject<'a> {
    Characteristic(&'a Characteristic),
    Measurement(&'a Measurement),
    AxisPts(&'a AxisPts),
    Blob(&'a Blob),
    Instance(&'a Instance),
}

/// An item of the name space of conversion tables
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModuleCompuTab<'a> {
    CompuTab(&'a CompuTab),
    CompuVtab(&'a CompuVtab),
    CompuVtabRange(&'a CompuVtabRange),
}

impl ModuleObject<'_> {
    pub fn blockname(&self) -> &'static str {
        match self {
            ModuleObject::Characteristic(_) => "CHARACTERISTIC",
            ModuleObject::Measurement(_) => "MEASUREMENT",
            ModuleObject::AxisPts(_) => "AXIS_PTS",
            ModuleObject::Blob(_) => "BLOB",
            ModuleObject::Instance(_) => "INSTANCE",
        }
    }
}

impl A2lObjectName for ModuleObject<'_> {
    fn get_name(&self) -> &str {
        match self {
            ModuleObject::Characteristic(item) => item.get_name(),
            ModuleObject::Measurement(item) => item.get_name(),
            ModuleObject::AxisPts(item) => item.get_name(),
            ModuleObject::Blob(item) => item.get_name(),
            ModuleObject::Instance(item) => item.get_name(),
        }
    }

    fn get_line(&self) -> u32 {
        match self {
            ModuleObject::Characteristic(item) => item.get_line(),
            ModuleObject::Measurement(item) => item.get_line(),
            ModuleObject::AxisPts(item) => item.get_line(),
            ModuleObject::Blob(item) => item.get_line(),
            ModuleObject::Instance(item) => item.get_line(),
        }
    }
}

impl Module {
    /// all items of the object name space
    pub fn objects(&self) -> impl Iterator<Item = ModuleObject<'_>> {
        self.characteristic
            .iter()
            .map(ModuleObject::Characteristic)
            .chain(self.measurement.iter().map(ModuleObject::Measurement))
            .chain(self.axis_pts.iter().map(ModuleObject::AxisPts))
            .chain(self.blob.iter().map(ModuleObject::Blob))
            .chain(self.instance.iter().map(ModuleObject::Instance))
    }

    pub fn find_object(&self, name: &str) -> Option<ModuleObject<'_>> {
        if let Some(item) = self.characteristic.get(name) {
            Some(ModuleObject::Characteristic(item))
        } else if let Some(item) = self.measurement.get(name) {
            Some(ModuleObject::Measurement(item))
        } else if let Some(item) = self.axis_pts.get(name) {
            Some(ModuleObject::AxisPts(item))
        } else if let Some(item) = self.blob.get(name) {
            Some(ModuleObject::Blob(item))
        } else {
            self.instance.get(name).map(ModuleObject::Instance)
        }
    }

    pub fn find_compu_tab(&self, name: &str) -> Option<ModuleCompuTab<'_>> {
        if let Some(item) = self.compu_tab.get(name) {
            Some(ModuleCompuTab::CompuTab(item))
        } else if let Some(item) = self.compu_vtab.get(name) {
            Some(ModuleCompuTab::CompuVtab(item))
        } else {
            self.compu_vtab_range
                .get(name)
                .map(ModuleCompuTab::CompuVtabRange)
        }
    }

    /// Build a map of the object name space.
    ///
    /// Names that are used by objects of different kinds are reported in `log_msgs`; the first
    /// object with the name is kept.
    pub fn object_map(&self, log_msgs: &mut Vec<A2lError>) -> FnvHashMap<String, ModuleObject<'_>> {
        let mut map: FnvHashMap<String, ModuleObject<'_>> = FnvHashMap::default();
        for object in self.objects() {
            if let Some(existing) = map.get(object.get_name()) {
                log_msgs.push(A2lError::NameCollisionError {
                    item_name: object.get_name().to_string(),
                    blockname: format!("{} and {}", existing.blockname(), object.blockname()),
                    line_1: existing.get_line(),
                    line_2: object.get_line(),
                });
            } else {
                map.insert(object.get_name().to_string(), object);
            }
        }
        map
    }
}
