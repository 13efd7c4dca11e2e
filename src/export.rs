use std::fs;
use std::io::{self, Seek, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};
use tempfile::Builder;
use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::domain::ExportFormat;
use crate::error::OverviewError;
use crate::table::{Cell, Table};

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
    r#"</Relationships>"#
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#
);

pub fn export_table(
    table: &Table,
    dir: &Utf8Path,
    stem: &str,
    format: ExportFormat,
) -> Result<Utf8PathBuf, OverviewError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| OverviewError::Filesystem(err.to_string()))?;
    let path = dir.join(format!("{stem}.{}", format.extension()));

    let mut temp = Builder::new()
        .prefix(".aba-overview")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| OverviewError::Filesystem(err.to_string()))?;
    match format {
        ExportFormat::Csv => write_csv(table, temp.as_file_mut())?,
        ExportFormat::Xlsx => {
            write_xlsx(table, temp.as_file_mut(), DEFAULT_SHEET_NAME)?;
        }
    }
    temp.as_file_mut()
        .flush()
        .map_err(|err| OverviewError::Filesystem(err.to_string()))?;

    if path.as_std_path().exists() {
        fs::remove_file(path.as_std_path())
            .map_err(|err| OverviewError::Filesystem(err.to_string()))?;
    }
    temp.persist(path.as_std_path())
        .map_err(|err| OverviewError::Filesystem(err.to_string()))?;

    info!(path = %path, rows = table.len(), %format, "exported table");
    Ok(path)
}

pub fn write_csv<W: Write>(table: &Table, mut writer: W) -> Result<(), OverviewError> {
    let header = table
        .columns()
        .iter()
        .map(|column| csv_field(column))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{header}").map_err(export_io)?;
    for row in table.rows() {
        let line = row
            .iter()
            .map(|cell| csv_field(&cell.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{line}").map_err(export_io)?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_xlsx<W: Write + Seek>(
    table: &Table,
    writer: W,
    sheet_name: &str,
) -> Result<W, OverviewError> {
    validate_sheet_name(sheet_name)?;

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("docProps/core.xml", core_properties()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)
            .map_err(|err| OverviewError::Export(err.to_string()))?;
        zip.write_all(content.as_bytes()).map_err(export_io)?;
    }

    zip.finish()
        .map_err(|err| OverviewError::Export(err.to_string()))
}

fn validate_sheet_name(name: &str) -> Result<(), OverviewError> {
    let invalid = name.is_empty()
        || name.chars().count() > 31
        || name.contains(['[', ']', ':', '*', '?', '/', '\\']);
    if invalid {
        return Err(OverviewError::Export(format!("invalid sheet name: {name}")));
    }
    Ok(())
}

fn core_properties() -> String {
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            r#"<dc:creator>aba-overview {version}</dc:creator>"#,
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
            r#"</cp:coreProperties>"#
        ),
        version = env!("CARGO_PKG_VERSION"),
        created = created,
    )
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{name}" sheetId="1" r:id="rId1"/></sheets>"#,
            r#"</workbook>"#
        ),
        name = xml_escape(sheet_name),
    )
}

fn sheet_xml(table: &Table) -> String {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        r#"<sheetData>"#
    ));

    let header = table
        .columns()
        .iter()
        .map(|column| Cell::Text(column.clone()))
        .collect::<Vec<_>>();
    push_row(&mut xml, 1, &header);
    for (index, row) in table.rows().iter().enumerate() {
        push_row(&mut xml, index + 2, row);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row(xml: &mut String, row_number: usize, cells: &[Cell]) {
    xml.push_str(&format!(r#"<row r="{row_number}">"#));
    for (index, cell) in cells.iter().enumerate() {
        let reference = format!("{}{row_number}", column_name(index));
        match cell {
            Cell::Integer(value) => {
                xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            }
            Cell::Text(value) => {
                xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    xml_escape(value)
                ));
            }
        }
    }
    xml.push_str("</row>");
}

pub fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        name.push(b'A' + rem as u8);
        remaining = (remaining - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            ch if (ch as u32) < 0x20 => {}
            ch => out.push(ch),
        }
    }
    out
}

fn export_io(err: io::Error) -> OverviewError {
    OverviewError::Export(err.to_string())
}
