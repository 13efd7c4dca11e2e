use assert_matches::assert_matches;
use clap::ValueEnum;

use aba_overview::domain::{EntityKind, ExportFormat, RecordType, ScanType};
use aba_overview::error::OverviewError;

#[test]
fn entity_kinds_map_to_query_names() {
    assert_eq!(EntityKind::Sample.query_name(), "SAMPLE");
    assert_eq!(EntityKind::Person.query_name(), "PERSON");
    assert_eq!(EntityKind::Wavelength.query_name(), "Wavelengths");
}

#[test]
fn scan_types_have_titles_and_stems() {
    let stems: Vec<&str> = ScanType::ALL.iter().map(|scan| scan.file_stem()).collect();
    assert_eq!(stems, vec!["LSM_overview", "TwoPhoton_overview", "CT_overview"]);
    assert_eq!(ScanType::Lsm.title(), "Light sheet Microscopy Data");
    assert_eq!(
        serde_json::to_string(&ScanType::TwoPhoton).unwrap(),
        r#""two-photon""#
    );
}

#[test]
fn scan_types_parse_through_value_enum() {
    assert_eq!(
        <ScanType as ValueEnum>::from_str("two-photon", false),
        Ok(ScanType::TwoPhoton)
    );
    assert!(<ScanType as ValueEnum>::from_str("mri", false).is_err());
}

#[test]
fn parse_record_type() {
    let record_type: RecordType = "TWO_PHOTON_SCAN".parse().unwrap();
    assert_eq!(record_type.as_str(), "TWO_PHOTON_SCAN");
    assert_matches!(
        "1SCAN".parse::<RecordType>(),
        Err(OverviewError::InvalidRecordType(_))
    );
}

#[test]
fn export_format_extensions() {
    assert_eq!(ExportFormat::Xlsx.extension(), "xlsx");
    assert_eq!(ExportFormat::Csv.to_string(), "csv");
}
