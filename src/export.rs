//! Plain-text exports of processed rows.

use std::path::Path;

use crate::error::{Result, ScraperError};
use crate::processor::{Row, COLUMNS};

/// Rows as pretty JSON objects
pub fn format_json(rows: &[Row]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Rows as CSV under the spreadsheet headers
pub fn format_csv(rows: &[Row]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.values())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ScraperError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ScraperError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn export_csv(rows: &[Row], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, format_csv(rows)?)?;
    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn export_json(rows: &[Row], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, format_json(rows)?)?;
    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row {
            url: "https://www.tascaparts.com/oem-parts/gm-wheel-84585383".into(),
            sku: "84585383".into(),
            pn: "84585383".into(),
            title: "Wheel, Alloy".into(),
            actual_price: "612.45".into(),
            year: "2020".into(),
            make: "GMC".into(),
            ..Row::default()
        }
    }

    #[test]
    fn csv_has_all_columns() {
        let csv = format_csv(&[row()]).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("url,Image,date,sku,PN,CCC"));
        assert!(header.ends_with("year,make,model,trims,engines"));
        let record = lines.next().unwrap();
        assert!(record.contains("\"Wheel, Alloy\""));
        assert_eq!(record.matches(',').count(), 34);
    }

    #[test]
    fn json_and_files() {
        let json = format_json(&[row()]).unwrap();
        let parsed: Vec<Row> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].make, "GMC");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wheels.csv");
        export_csv(&[row()], &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("84585383"));
    }
}
