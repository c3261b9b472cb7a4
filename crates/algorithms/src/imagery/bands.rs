//! Spectral band roles and their mapping to sensor band names

use std::collections::BTreeMap;
use std::fmt;

use cloudless_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// What a reflectance band measures, independent of sensor naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandRole {
    /// Coastal / aerosol (Landsat 8 B1)
    UltraBlue,
    Blue,
    Green,
    Red,
    /// Near infrared
    Nir,
    /// Short-wave infrared 1
    Swir1,
    /// Short-wave infrared 2
    Swir2,
}

impl BandRole {
    /// All roles in wavelength order
    pub const ALL: [BandRole; 7] = [
        BandRole::UltraBlue,
        BandRole::Blue,
        BandRole::Green,
        BandRole::Red,
        BandRole::Nir,
        BandRole::Swir1,
        BandRole::Swir2,
    ];

    /// Position in wavelength order, starting at 1
    pub fn number(self) -> usize {
        BandRole::ALL.iter().position(|r| *r == self).map_or(0, |i| i + 1)
    }

    /// Human-readable label used in export descriptions
    pub fn label(self) -> &'static str {
        match self {
            BandRole::UltraBlue => "ultraBlue",
            BandRole::Blue => "blue",
            BandRole::Green => "green",
            BandRole::Red => "red",
            BandRole::Nir => "nearInfrared",
            BandRole::Swir1 => "shortInfrared1",
            BandRole::Swir2 => "shortInfrared2",
        }
    }

    /// Landsat 8 OLI band name for this role
    pub fn landsat8(self) -> &'static str {
        match self {
            BandRole::UltraBlue => "B1",
            BandRole::Blue => "B2",
            BandRole::Green => "B3",
            BandRole::Red => "B4",
            BandRole::Nir => "B5",
            BandRole::Swir1 => "B6",
            BandRole::Swir2 => "B7",
        }
    }
}

impl fmt::Display for BandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which raster band plays which spectral role.
///
/// Serializes as a plain `{ "red": "B4", ... }` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandMapping {
    roles: BTreeMap<BandRole, String>,
}

impl BandMapping {
    /// Mapping with no roles assigned
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// Landsat 8 OLI: B1 ultra-blue through B7 SWIR2
    pub fn landsat8() -> Self {
        Self {
            roles: BandRole::ALL
                .iter()
                .map(|r| (*r, r.landsat8().to_string()))
                .collect(),
        }
    }

    /// Same mapping with `role` assigned to `band`
    pub fn with(mut self, role: BandRole, band: impl Into<String>) -> Self {
        self.roles.insert(role, band.into());
        self
    }

    pub fn get(&self, role: BandRole) -> Option<&str> {
        self.roles.get(&role).map(String::as_str)
    }

    /// Band name for `role`, or an error when the role is unmapped
    pub fn resolve(&self, role: BandRole) -> Result<&str> {
        self.get(role).ok_or_else(|| Error::InvalidParameter {
            name: "bands",
            value: role.to_string(),
            reason: "no source band mapped to this role".into(),
        })
    }

    /// Role played by `band`, if any
    pub fn role_of(&self, band: &str) -> Option<BandRole> {
        self.roles
            .iter()
            .find_map(|(role, name)| (name == band).then_some(*role))
    }

    /// Mapped roles in wavelength order
    pub fn iter(&self) -> impl Iterator<Item = (BandRole, &str)> {
        self.roles.iter().map(|(r, n)| (*r, n.as_str()))
    }
}

impl Default for BandMapping {
    fn default() -> Self {
        Self::landsat8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landsat8_mapping() {
        let m = BandMapping::landsat8();
        assert_eq!(m.get(BandRole::Red), Some("B4"));
        assert_eq!(m.get(BandRole::Nir), Some("B5"));
        assert_eq!(m.get(BandRole::Swir2), Some("B7"));
        assert_eq!(m.role_of("B6"), Some(BandRole::Swir1));
        assert_eq!(m.role_of("QA"), None);
    }

    #[test]
    fn test_role_numbers_and_labels() {
        assert_eq!(BandRole::UltraBlue.number(), 1);
        assert_eq!(BandRole::Nir.number(), 5);
        assert_eq!(BandRole::Swir2.label(), "shortInfrared2");
    }

    #[test]
    fn test_resolve_unmapped() {
        let m = BandMapping::empty().with(BandRole::Red, "red");
        assert_eq!(m.resolve(BandRole::Red).unwrap(), "red");
        assert!(matches!(
            m.resolve(BandRole::Nir),
            Err(Error::InvalidParameter { name: "bands", .. })
        ));
    }

    #[test]
    fn test_serde_object() {
        let m = BandMapping::empty()
            .with(BandRole::Nir, "nir")
            .with(BandRole::Red, "red");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"red":"red","nir":"nir"}"#);
        let back: BandMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
