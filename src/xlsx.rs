//! Styled Excel workbooks: the main data sheet, the summary sheet and per-site splits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::error::Result;
use crate::export::ensure_parent;
use crate::processor::{Row, SummaryStats, COLUMNS};

pub const DATA_SHEET: &str = "Wheels Data";
pub const SUMMARY_SHEET: &str = "Summary";

const MAX_WIDTH: usize = 50;
/// Rows sampled when sizing columns
const WIDTH_SAMPLE: usize = 100;

const WIDTH_OVERRIDES: &[(&str, f64)] = &[
    ("url", 40.0),
    ("Image", 40.0),
    ("date", 18.0),
    ("sku", 15.0),
    ("PN", 15.0),
    ("AC$", 12.0),
    ("msrp", 12.0),
    ("title", 50.0),
    ("description", 60.0),
    ("year", 8.0),
    ("make", 15.0),
    ("model", 20.0),
    ("trims", 30.0),
    ("engines", 30.0),
];

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_font_size(11)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xD3D3D3))
}

fn cell_format() -> Format {
    Format::new()
        .set_align(FormatAlign::Top)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xD3D3D3))
}

/// Width for column `col`: a fixed override, else the longest sampled value plus padding
pub fn column_width(col: usize, rows: &[Row]) -> f64 {
    let header = COLUMNS[col];
    if let Some((_, width)) = WIDTH_OVERRIDES.iter().find(|(name, _)| *name == header) {
        return *width;
    }
    let longest = rows
        .iter()
        .take(WIDTH_SAMPLE - 1)
        .map(|r| r.values()[col].chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);
    (longest + 2).min(MAX_WIDTH) as f64
}

/// Builds the data workbook
pub struct ExcelExporter {
    workbook: Workbook,
    formatting: bool,
}

impl ExcelExporter {
    pub fn new(formatting: bool) -> Self {
        Self {
            workbook: Workbook::new(),
            formatting,
        }
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        let formatting = self.formatting;
        let sheet = self.workbook.add_worksheet();
        sheet.set_name(DATA_SHEET)?;

        let (header, cell) = (header_format(), cell_format());
        for (col, name) in COLUMNS.iter().enumerate() {
            write_cell(sheet, 0, col as u16, name, formatting.then_some(&header))?;
        }
        for (i, row) in rows.iter().enumerate() {
            for (col, value) in row.values().iter().enumerate() {
                write_cell(sheet, i as u32 + 1, col as u16, value, formatting.then_some(&cell))?;
            }
        }

        if formatting {
            for col in 0..COLUMNS.len() {
                sheet.set_column_width(col as u16, column_width(col, rows))?;
            }
            sheet.set_freeze_panes(1, 0)?;
        }
        Ok(())
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        self.workbook.save(path)?;
        Ok(())
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &str, format: Option<&Format>) -> Result<()> {
    match format {
        Some(format) => sheet.write_string_with_format(row, col, value, format)?,
        None => sheet.write_string(row, col, value)?,
    };
    Ok(())
}

/// Write rows to a single-sheet workbook
pub fn export_xlsx(rows: &[Row], path: &Path, formatting: bool) -> Result<()> {
    log::info!("Exporting {} rows to {}", rows.len(), path.display());
    let mut exporter = ExcelExporter::new(formatting);
    exporter.write_rows(rows)?;
    exporter.save(path)?;
    log::info!("Successfully exported to {}", path.display());
    Ok(())
}

/// Write summary statistics as Metric/Value pairs
pub fn export_summary(stats: &SummaryStats, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;

    let header = header_format();
    sheet.write_string_with_format(0, 0, "Metric", &header)?;
    sheet.write_string_with_format(0, 1, "Value", &header)?;
    for (i, (metric, value)) in stats.entries().iter().enumerate() {
        sheet.write_string(i as u32 + 1, 0, metric)?;
        sheet.write_string(i as u32 + 1, 1, value)?;
    }
    sheet.set_column_width(0, 30)?;
    sheet.set_column_width(1, 20)?;

    ensure_parent(path)?;
    workbook.save(path)?;
    log::info!("Summary exported to {}", path.display());
    Ok(())
}

/// One `wheels_<host>.xlsx` per product host; returns the files written
pub fn split_by_site(rows: &[Row], dir: &Path, formatting: bool) -> Result<Vec<PathBuf>> {
    let mut by_host: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    for row in rows {
        by_host.entry(row.host()).or_default().push(row.clone());
    }

    let mut written = Vec::new();
    for (host, site_rows) in by_host {
        let path = dir.join(format!("wheels_{}.xlsx", host.replace(['/', ':'], "_")));
        export_xlsx(&site_rows, &path, formatting)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::summary;

    fn row(url: &str, title: &str) -> Row {
        Row {
            url: url.into(),
            sku: "1".into(),
            pn: "1".into(),
            title: title.into(),
            make: "GMC".into(),
            actual_price: "10".into(),
            ..Row::default()
        }
    }

    #[test]
    fn column_widths() {
        let rows = vec![row("https://a.test/x", "t")];
        let col = |name: &str| COLUMNS.iter().position(|c| *c == name).unwrap();
        assert_eq!(column_width(col("url"), &rows), 40.0);
        assert_eq!(column_width(col("description"), &rows), 60.0);
        // header "CCC" is the longest value
        assert_eq!(column_width(col("CCC"), &rows), 5.0);

        let mut long = row("https://a.test/x", "t");
        long.positions = "x".repeat(120);
        assert_eq!(column_width(col("positions"), &[long]), 50.0);
    }

    #[test]
    fn writes_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            row("https://www.tascaparts.com/oem-parts/a", "Wheel"),
            row("https://parts.byersporsche.com/p/Porsche__/Rim/1/2.html", "Rim"),
            row("not a url", "Cap"),
        ];

        let main = dir.path().join("out").join("wheels_data.xlsx");
        export_xlsx(&rows, &main, true).unwrap();
        assert!(main.exists());

        let summary_path = dir.path().join("summary.xlsx");
        export_summary(&summary(&rows), &summary_path).unwrap();
        assert!(summary_path.exists());

        let files = split_by_site(&rows, dir.path(), false).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "wheels_parts.byersporsche.com.xlsx",
                "wheels_unknown.xlsx",
                "wheels_www.tascaparts.com.xlsx",
            ]
        );
        assert!(files.iter().all(|p| p.exists()));
    }
}
