use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::OverviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = OverviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(OverviewError::InvalidEntityId(value.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| OverviewError::InvalidEntityId(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Sample,
    Person,
    Wavelength,
}

impl EntityKind {
    pub fn query_name(self) -> &'static str {
        match self {
            EntityKind::Sample => "SAMPLE",
            EntityKind::Person => "PERSON",
            EntityKind::Wavelength => "Wavelengths",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Sample => write!(f, "sample"),
            EntityKind::Person => write!(f, "person"),
            EntityKind::Wavelength => write!(f, "wavelength"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordType(String);

impl RecordType {
    pub const LSM_SCAN: &'static str = "LSM_SCAN";

    pub fn lsm_scan() -> Self {
        Self(Self::LSM_SCAN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordType {
    type Err = OverviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|err| OverviewError::InvalidRecordType(err.to_string()))?;
        let trimmed = value.trim();
        if !re.is_match(trimmed) {
            return Err(OverviewError::InvalidRecordType(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanType {
    Lsm,
    TwoPhoton,
    Ct,
}

impl ScanType {
    pub const ALL: [ScanType; 3] = [ScanType::Lsm, ScanType::TwoPhoton, ScanType::Ct];

    pub fn title(self) -> &'static str {
        match self {
            ScanType::Lsm => "Light sheet Microscopy Data",
            ScanType::TwoPhoton => "Two Photon Microscopy Data",
            ScanType::Ct => "CT Scan Data",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ScanType::Lsm => "LSM_overview",
            ScanType::TwoPhoton => "TwoPhoton_overview",
            ScanType::Ct => "CT_overview",
        }
    }

    pub fn record_type(self) -> Option<RecordType> {
        match self {
            ScanType::Lsm => Some(RecordType::lsm_scan()),
            ScanType::TwoPhoton | ScanType::Ct => None,
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::Lsm => write!(f, "lsm"),
            ScanType::TwoPhoton => write!(f, "two-photon"),
            ScanType::Ct => write!(f, "ct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_entity_id() {
        let id: EntityId = " 1042 ".parse().unwrap();
        assert_eq!(id.get(), 1042);
        assert_eq!(id.to_string(), "1042");
    }

    #[test]
    fn parse_entity_id_invalid() {
        assert_matches!(
            "12a".parse::<EntityId>(),
            Err(OverviewError::InvalidEntityId(_))
        );
        assert_matches!(
            "".parse::<EntityId>(),
            Err(OverviewError::InvalidEntityId(_))
        );
    }

    #[test]
    fn record_type_rejects_query_syntax() {
        assert!("LSM_SCAN".parse::<RecordType>().is_ok());
        assert_matches!(
            "LSM_SCAN WITH id = '1'".parse::<RecordType>(),
            Err(OverviewError::InvalidRecordType(_))
        );
    }

    #[test]
    fn scan_type_routing() {
        assert_eq!(ScanType::Lsm.record_type(), Some(RecordType::lsm_scan()));
        assert_eq!(ScanType::TwoPhoton.record_type(), None);
        assert_eq!(ScanType::Ct.file_stem(), "CT_overview");
    }
}
