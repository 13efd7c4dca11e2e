use serde::Serialize;
use tracing::{debug, info, trace};

use crate::domain::{EntityId, EntityKind, RecordType};
use crate::error::OverviewError;
use crate::store::{Entity, MetadataStore};

pub const NONE_LITERAL: &str = "None";

pub const COLUMNS: [&str; 21] = [
    "Entry #",
    "Scan Type",
    "Sample ID",
    "Sample Name / Barcode",
    "Uploader ID",
    "Uploader First Name",
    "Uploader Family Name",
    "Uploader Email Address",
    "Upload Date [YYYY-MM-DD]",
    "Resolution in XY Plane [mu m]",
    "Resolution in Z direction [mu m]",
    "Number of Channels",
    "Wavelengths",
    "Illumination Right",
    "Illumination Left",
    "Aperture [%]",
    "Exposure Times [mu s]",
    "Objective",
    "Zoom",
    "Sheet Width [%]",
    "Additional Comments",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewRow {
    #[serde(rename = "Entry #")]
    pub entry: u64,
    #[serde(rename = "Scan Type")]
    pub scan_type: String,
    #[serde(rename = "Sample ID")]
    pub sample_id: String,
    #[serde(rename = "Sample Name / Barcode")]
    pub sample_name: String,
    #[serde(rename = "Uploader ID")]
    pub uploader_id: String,
    #[serde(rename = "Uploader First Name")]
    pub uploader_given_name: String,
    #[serde(rename = "Uploader Family Name")]
    pub uploader_family_name: String,
    #[serde(rename = "Uploader Email Address")]
    pub uploader_email: String,
    #[serde(rename = "Upload Date [YYYY-MM-DD]")]
    pub date: String,
    #[serde(rename = "Resolution in XY Plane [mu m]")]
    pub resolution_xy: String,
    #[serde(rename = "Resolution in Z direction [mu m]")]
    pub resolution_z: String,
    #[serde(rename = "Number of Channels")]
    pub number_of_channels: String,
    #[serde(rename = "Wavelengths")]
    pub wavelengths: String,
    #[serde(rename = "Illumination Right")]
    pub illumination_right: String,
    #[serde(rename = "Illumination Left")]
    pub illumination_left: String,
    #[serde(rename = "Aperture [%]")]
    pub apertures: String,
    #[serde(rename = "Exposure Times [mu s]")]
    pub exposure_times: String,
    #[serde(rename = "Objective")]
    pub objective: String,
    #[serde(rename = "Zoom")]
    pub zoom: String,
    #[serde(rename = "Sheet Width [%]")]
    pub sheet_width: String,
    #[serde(rename = "Additional Comments")]
    pub additional_comments: String,
}

impl OverviewRow {
    pub fn text_cells(&self) -> [&str; 20] {
        [
            &self.scan_type,
            &self.sample_id,
            &self.sample_name,
            &self.uploader_id,
            &self.uploader_given_name,
            &self.uploader_family_name,
            &self.uploader_email,
            &self.date,
            &self.resolution_xy,
            &self.resolution_z,
            &self.number_of_channels,
            &self.wavelengths,
            &self.illumination_right,
            &self.illumination_left,
            &self.apertures,
            &self.exposure_times,
            &self.objective,
            &self.zoom,
            &self.sheet_width,
            &self.additional_comments,
        ]
    }
}

pub fn extract_overview<S>(
    store: &S,
    record_type: &RecordType,
) -> Result<Vec<OverviewRow>, OverviewError>
where
    S: MetadataStore + ?Sized,
{
    let records = store.find_records(record_type)?;
    debug!(record_type = %record_type, records = records.len(), "found scan records");

    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let entry = index as u64 + 1;
        let row = flatten_record(store, record_type, record, entry)?;
        debug!(entry, record = %record.id, sample = %row.sample_id, "flattened scan record");
        rows.push(row);
    }

    info!(record_type = %record_type, rows = rows.len(), "overview extracted");
    Ok(rows)
}

fn flatten_record<S>(
    store: &S,
    record_type: &RecordType,
    record: &Entity,
    entry: u64,
) -> Result<OverviewRow, OverviewError>
where
    S: MetadataStore + ?Sized,
{
    let sample_id = record.reference("Sample")?;
    let sample = lookup(store, EntityKind::Sample, sample_id)?;
    let sample_name = sample.name.unwrap_or_else(|| NONE_LITERAL.to_string());

    let uploader_id = record.reference("operator")?;
    let uploader_given_name = lookup(store, EntityKind::Person, uploader_id)?.text("given_name")?;
    let uploader_family_name =
        lookup(store, EntityKind::Person, uploader_id)?.text("family_name")?;
    let uploader_email = lookup(store, EntityKind::Person, uploader_id)?.text("email_address")?;

    let date = record.text("date")?;
    let resolution_xy = round_to_places(record.number("delta_pixel_xy")?, 2);
    let resolution_z = round_to_places(record.number("delta_pixel_z")?, 2);
    let declared_channels = record.integer("number_of_channels")?;

    let mut wavelengths = Vec::new();
    for filter in record.references("filters")? {
        let wavelength = lookup(store, EntityKind::Wavelength, filter)?;
        let name = wavelength
            .name
            .ok_or_else(|| OverviewError::MissingProperty {
                entity: filter,
                property: "name".to_string(),
            })?;
        wavelengths.push(name);
    }

    if i64::try_from(wavelengths.len()).ok() != Some(declared_channels) {
        return Err(OverviewError::ChannelMismatch {
            record: record.id,
            declared: declared_channels,
            resolved: wavelengths.len(),
        });
    }

    Ok(OverviewRow {
        entry,
        scan_type: record_type.to_string(),
        sample_id: sample_id.to_string(),
        sample_name,
        uploader_id: uploader_id.to_string(),
        uploader_given_name,
        uploader_family_name,
        uploader_email,
        date,
        resolution_xy,
        resolution_z,
        number_of_channels: declared_channels.to_string(),
        wavelengths: wavelengths.join(", "),
        illumination_right: record.text("illumination_right")?,
        illumination_left: record.text("illumination_left")?,
        apertures: join_integers(&record.integers("apertures")?),
        exposure_times: join_integers(&record.integers("exposure_times")?),
        objective: record.text("objective")?,
        zoom: record.text("zoom")?,
        sheet_width: record.text("sheet_width")?,
        additional_comments: normalize_comment(record)?,
    })
}

fn lookup<S>(store: &S, kind: EntityKind, id: EntityId) -> Result<Entity, OverviewError>
where
    S: MetadataStore + ?Sized,
{
    trace!(%kind, %id, "resolving reference");
    store.find_unique(kind, id)
}

fn normalize_comment(record: &Entity) -> Result<String, OverviewError> {
    let value = record.scalar("additional_comments")?;
    let text = if value.is_null() {
        String::new()
    } else {
        value.to_string()
    };
    if text.is_empty() {
        return Ok(NONE_LITERAL.to_string());
    }
    Ok(text)
}

pub fn join_integers(values: &[i64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rounds `value` half away from zero at `places` decimals and renders exactly
/// that many fractional digits.
///
/// Rounding operates on the shortest decimal representation that round-trips
/// to `value`, so `2.005` rounds to `2.01` even though the nearest binary
/// double lies slightly below it.
pub fn round_to_places(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let mut frac: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();
    let round_up = frac.get(places).is_some_and(|digit| *digit >= 5);
    frac.resize(places, 0);
    digits.extend(frac);

    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - places;
    let mut out = String::with_capacity(digits.len() + 2);
    let is_zero = digits.iter().all(|digit| *digit == 0);
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|digit| char::from(b'0' + digit)));
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|digit| char::from(b'0' + digit)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to_places(3.14159, 2), "3.14");
        assert_eq!(round_to_places(2.005, 2), "2.01");
        assert_eq!(round_to_places(2.004, 2), "2.00");
        assert_eq!(round_to_places(2.015, 2), "2.02");
        assert_eq!(round_to_places(-2.005, 2), "-2.01");
    }

    #[test]
    fn rounding_carries_into_integer_part() {
        assert_eq!(round_to_places(9.999, 2), "10.00");
        assert_eq!(round_to_places(0.995, 2), "1.00");
        assert_eq!(round_to_places(4.0, 2), "4.00");
        assert_eq!(round_to_places(0.5, 0), "1");
    }

    #[test]
    fn negative_values_rounding_to_zero_drop_the_sign() {
        assert_eq!(round_to_places(-0.001, 2), "0.00");
    }

    #[test]
    fn columns_match_row_shape() {
        let row_json = serde_json::to_value(OverviewRow {
            entry: 1,
            scan_type: String::new(),
            sample_id: String::new(),
            sample_name: String::new(),
            uploader_id: String::new(),
            uploader_given_name: String::new(),
            uploader_family_name: String::new(),
            uploader_email: String::new(),
            date: String::new(),
            resolution_xy: String::new(),
            resolution_z: String::new(),
            number_of_channels: String::new(),
            wavelengths: String::new(),
            illumination_right: String::new(),
            illumination_left: String::new(),
            apertures: String::new(),
            exposure_times: String::new(),
            objective: String::new(),
            zoom: String::new(),
            sheet_width: String::new(),
            additional_comments: String::new(),
        })
        .unwrap();
        let keys: Vec<&str> = row_json
            .as_object()
            .unwrap()
            .keys()
            .map(|key| key.as_str())
            .collect();
        assert_eq!(keys, COLUMNS.to_vec());
    }
}
