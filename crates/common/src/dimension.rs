//! The eight data-governance dimensions surveyed by EnTrust
//!
//! Dimension slugs are part of artifact paths and report file names, so the
//! set is closed: free-form dimension strings never reach path construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A data-governance survey dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    DataQuality,
    DataPrivacy,
    DataSecurity,
    DataArchitecture,
    MetadataManagement,
    DataLifecycle,
    GovernanceOperatingModel,
    DataLiteracy,
}

impl Dimension {
    /// All dimensions, in report order
    pub const ALL: [Dimension; 8] = [
        Dimension::DataQuality,
        Dimension::DataPrivacy,
        Dimension::DataSecurity,
        Dimension::DataArchitecture,
        Dimension::MetadataManagement,
        Dimension::DataLifecycle,
        Dimension::GovernanceOperatingModel,
        Dimension::DataLiteracy,
    ];

    /// Stable slug used in storage paths and file names
    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::DataQuality => "data_quality",
            Dimension::DataPrivacy => "data_privacy",
            Dimension::DataSecurity => "data_security",
            Dimension::DataArchitecture => "data_architecture",
            Dimension::MetadataManagement => "metadata_management",
            Dimension::DataLifecycle => "data_lifecycle",
            Dimension::GovernanceOperatingModel => "governance_operating_model",
            Dimension::DataLiteracy => "data_literacy",
        }
    }

    /// Human-readable title used in report headings
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::DataQuality => "Data Quality",
            Dimension::DataPrivacy => "Data Privacy & Compliance",
            Dimension::DataSecurity => "Data Security",
            Dimension::DataArchitecture => "Data Architecture",
            Dimension::MetadataManagement => "Metadata Management",
            Dimension::DataLifecycle => "Data Lifecycle Management",
            Dimension::GovernanceOperatingModel => "Governance & Operating Model",
            Dimension::DataLiteracy => "Data Literacy & Culture",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.slug() == s)
            .ok_or_else(|| format!("unknown dimension: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_roundtrip() {
        for dim in Dimension::ALL {
            assert_eq!(dim.slug().parse::<Dimension>().unwrap(), dim);
        }
    }

    #[test]
    fn test_slugs_are_path_safe() {
        for dim in Dimension::ALL {
            assert!(dim
                .slug()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        assert!("../etc".parse::<Dimension>().is_err());
        assert!("Data Quality".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_serde_matches_slug() {
        let json = serde_json::to_string(&Dimension::DataPrivacy).unwrap();
        assert_eq!(json, "\"data_privacy\"");
    }
}
