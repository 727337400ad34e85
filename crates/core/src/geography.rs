//! Geography reference data
//!
//! Read-only region -> district -> subdistrict tree, bundled as TOML and
//! consumed during hostel create/edit for cascading validation. The core
//! does not own this data and never mutates it.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::Location;

const EMBEDDED: &str = include_str!("../data/geography.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct GeoIndex {
    regions: Vec<Region>,
}

#[derive(Debug, Clone, Deserialize)]
struct Region {
    name: String,
    districts: Vec<District>,
}

#[derive(Debug, Clone, Deserialize)]
struct District {
    name: String,
    subdistricts: Vec<String>,
}

impl GeoIndex {
    /// Parse a geography table from TOML
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input)
            .map_err(|e| Error::Validation(format!("invalid geography table: {e}")))
    }

    /// The bundled reference tree
    pub fn embedded() -> Self {
        // The bundled table is a compile-time asset; a parse failure here
        // is a build defect, not a runtime condition
        Self::from_toml(EMBEDDED).expect("bundled geography table parses")
    }

    /// All region names
    pub fn regions(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    /// District names within a region, if the region exists
    pub fn districts(&self, region: &str) -> Option<Vec<&str>> {
        self.regions
            .iter()
            .find(|r| r.name == region)
            .map(|r| r.districts.iter().map(|d| d.name.as_str()).collect())
    }

    /// Subdistrict names within a district, if the chain exists
    pub fn subdistricts(&self, region: &str, district: &str) -> Option<Vec<&str>> {
        self.regions
            .iter()
            .find(|r| r.name == region)?
            .districts
            .iter()
            .find(|d| d.name == district)
            .map(|d| d.subdistricts.iter().map(|s| s.as_str()).collect())
    }

    /// Cascading validation: each level must exist under its parent
    pub fn validate(&self, location: &Location) -> Result<()> {
        let region = self
            .regions
            .iter()
            .find(|r| r.name == location.region)
            .ok_or_else(|| {
                Error::Validation(format!("unknown region: {}", location.region))
            })?;

        let district = region
            .districts
            .iter()
            .find(|d| d.name == location.district)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown district {} in {}",
                    location.district, location.region
                ))
            })?;

        if !district
            .subdistricts
            .iter()
            .any(|s| s == &location.subdistrict)
        {
            return Err(Error::Validation(format!(
                "unknown subdistrict {} in {}",
                location.subdistrict, location.district
            )));
        }

        if location.address.trim().is_empty() {
            return Err(Error::Validation("street address is required".into()));
        }

        Ok(())
    }
}
