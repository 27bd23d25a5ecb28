//! External lookups
//!
//! The builder needs three facts it cannot declare itself: the pre-existing
//! hosted zone, the NAT machine image and the region's availability zones.
//! They come from a [`ContextProvider`]; [`StaticContext`] serves them from a
//! JSON document so builds are reproducible and offline.

use crate::error::LookupError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A hosted zone that already exists in the target account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub zone_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImage {
    pub image_id: String,
    pub name: String,
    pub owner: String,
    /// ISO-8601; the newest match wins
    #[serde(default)]
    pub creation_date: String,
}

/// Image filter: name glob (`*` wildcard) plus owning account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub name_pattern: String,
    pub owners: Vec<String>,
}

impl ImageQuery {
    pub fn matches(&self, image: &MachineImage) -> bool {
        (self.owners.is_empty() || self.owners.iter().any(|o| *o == image.owner))
            && glob_match(&self.name_pattern, &image.name)
    }
}

/// Source of lookup results for one build
pub trait ContextProvider {
    fn hosted_zone(&self, domain: &str) -> Result<HostedZone, LookupError>;

    fn machine_image(&self, region: &str, query: &ImageQuery) -> Result<MachineImage, LookupError>;

    fn availability_zones(&self, region: &str) -> Result<Vec<String>, LookupError>;
}

/// Context document, keyed the way the lookups are issued
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticContext {
    /// domain -> zone
    pub hosted_zones: BTreeMap<String, HostedZone>,
    /// region -> candidate images
    pub machine_images: BTreeMap<String, Vec<MachineImage>>,
    /// region -> zone names; absent regions get `<region>a`, `<region>b`, `<region>c`
    pub availability_zones: BTreeMap<String, Vec<String>>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hosted_zone(mut self, domain: &str, zone_id: &str) -> Self {
        self.hosted_zones.insert(
            domain.to_string(),
            HostedZone {
                zone_id: zone_id.to_string(),
                name: domain.to_string(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_machine_image(mut self, region: &str, image: MachineImage) -> Self {
        self.machine_images
            .entry(region.to_string())
            .or_default()
            .push(image);
        self
    }

    #[must_use]
    pub fn with_availability_zones(mut self, region: &str, zones: &[&str]) -> Self {
        self.availability_zones.insert(
            region.to_string(),
            zones.iter().map(|z| (*z).to_string()).collect(),
        );
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(std::io::Error::other)
    }
}

impl ContextProvider for StaticContext {
    fn hosted_zone(&self, domain: &str) -> Result<HostedZone, LookupError> {
        // Zone names may be stored with or without the trailing root dot
        let trimmed = domain.trim_end_matches('.');
        self.hosted_zones
            .get(trimmed)
            .or_else(|| self.hosted_zones.get(&format!("{trimmed}.")))
            .cloned()
            .ok_or_else(|| LookupError::HostedZoneNotFound {
                domain: domain.to_string(),
            })
    }

    fn machine_image(&self, region: &str, query: &ImageQuery) -> Result<MachineImage, LookupError> {
        self.machine_images
            .get(region)
            .into_iter()
            .flatten()
            .filter(|image| query.matches(image))
            .max_by(|a, b| a.creation_date.cmp(&b.creation_date))
            .cloned()
            .ok_or_else(|| LookupError::MachineImageNotFound {
                pattern: query.name_pattern.clone(),
                owner: query.owners.join(","),
                region: region.to_string(),
            })
    }

    fn availability_zones(&self, region: &str) -> Result<Vec<String>, LookupError> {
        Ok(self
            .availability_zones
            .get(region)
            .cloned()
            .unwrap_or_else(|| ["a", "b", "c"].iter().map(|s| format!("{region}{s}")).collect()))
    }
}

/// Match `text` against a pattern where `*` spans any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // no wildcard at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
