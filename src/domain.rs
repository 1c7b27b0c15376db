use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KeggError;

static SPECIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[a-z]{2,4}|t\d{5})$").unwrap());

pub const DEFAULT_SPECIES: &str = "hsa";

/// Gene name exactly as the user typed it, minus surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneName(String);

impl GeneName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeneName {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KeggError::InvalidGeneName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// KEGG organism code, e.g. `hsa` or `mmu`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesCode(String);

impl SpeciesCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace prefix that species-scoped identifiers start with.
    pub fn prefix(&self) -> String {
        format!("{}:", self.0)
    }
}

impl Default for SpeciesCode {
    fn default() -> Self {
        Self(DEFAULT_SPECIES.to_string())
    }
}

impl fmt::Display for SpeciesCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpeciesCode {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if !SPECIES_RE.is_match(&normalized) {
            return Err(KeggError::InvalidSpecies(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Namespaced KEGG entry such as `hsa:7157`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn entry(&self) -> &str {
        self.0.split_once(':').map(|(_, entry)| entry).unwrap_or_default()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalId {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let valid = trimmed
            .split_once(':')
            .map(|(ns, entry)| !ns.is_empty() && !entry.is_empty())
            .unwrap_or(false)
            && !trimmed.chars().any(char::is_whitespace);
        if !valid {
            return Err(KeggError::InvalidExternalId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Pathway entry such as `hsa04110`. Artifact file names derive from it,
/// so it never contains whitespace or path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathwayId(String);

impl PathwayId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn image_file_name(&self) -> String {
        format!("{}.png", self.0)
    }

    pub fn text_file_name(&self) -> String {
        format!("{}.txt", self.0)
    }

    pub fn error_file_name(&self) -> String {
        format!("{}_error.txt", self.0)
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PathwayId {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = trimmed.strip_prefix("path:").unwrap_or(trimmed);
        let valid = !normalized.is_empty()
            && normalized != "."
            && normalized != ".."
            && !normalized
                .chars()
                .any(|ch| ch.is_whitespace() || ch == '/' || ch == '\\');
        if !valid {
            return Err(KeggError::InvalidPathwayId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

pub type GeneToIdMap = HashMap<GeneName, ExternalId>;

pub type IdToPathwaysMap = BTreeMap<ExternalId, Vec<PathwayId>>;

/// Splits a free-text gene list on commas and newlines. Blank and
/// unparsable entries are dropped; order and duplicates are kept.
pub fn parse_gene_list(text: &str) -> Vec<GeneName> {
    text.split([',', '\n', '\r'])
        .filter_map(|entry| entry.parse().ok())
        .collect()
}
