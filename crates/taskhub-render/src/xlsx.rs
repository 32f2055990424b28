//! Minimal SpreadsheetML workbook writer.
//!
//! Produces a zip container with one worksheet per sheet, cells written as
//! inline strings or numbers. No shared strings, styles or charts.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use taskhub_entity::snapshot::SnapshotStats;

use crate::error::RenderError;
use crate::template::escape_html;

const MAX_SHEET_NAME: usize = 31;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Text.
    Text(String),
    /// Number.
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

/// The six metric rows of a snapshot, in workbook order.
pub fn metric_rows(stats: &SnapshotStats) -> Vec<(&'static str, Cell)> {
    vec![
        ("Total Tasks", stats.total_tasks.into()),
        ("Completed Tasks", stats.completed_tasks.into()),
        ("To Do Tasks", stats.todo_tasks.into()),
        ("Working Tasks", stats.working_tasks.into()),
        ("Total Hours", stats.total_hours.into()),
        ("Average Daily Hours", stats.avg_daily_hours.into()),
    ]
}

/// Cut `name` to `max` characters. Sheet names may not start or end with an
/// apostrophe, so those are stripped along with surrounding blanks after
/// the cut.
fn clip_sheet_name(name: &str, max: usize) -> String {
    let edge = |c: char| c == '\'' || c.is_whitespace();
    let start = name.trim_start_matches(edge);
    let cut: String = start.chars().take(max).collect();
    cut.trim_end_matches(edge).to_string()
}

/// Builder collecting sheets before writing the container.
#[derive(Debug, Default)]
pub struct WorkbookBuilder {
    sheets: Vec<Sheet>,
    names: HashSet<String>,
}

impl WorkbookBuilder {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet of raw rows. The name is sanitised and made unique.
    pub fn add_sheet(&mut self, name: &str, rows: Vec<Vec<Cell>>) -> &mut Self {
        let name = self.unique_name(name);
        self.sheets.push(Sheet { name, rows });
        self
    }

    /// Add a key/value sheet of the six snapshot metrics with a header row.
    pub fn add_metrics_sheet(&mut self, name: &str, stats: &SnapshotStats) -> &mut Self {
        let mut rows = vec![vec![Cell::from("Metric"), Cell::from("Value")]];
        rows.extend(
            metric_rows(stats)
                .into_iter()
                .map(|(label, value)| vec![Cell::from(label), value]),
        );
        self.add_sheet(name, rows)
    }

    fn unique_name(&mut self, name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
                other => other,
            })
            .collect();
        let mut base = clip_sheet_name(&cleaned, MAX_SHEET_NAME);
        if base.is_empty() {
            base = format!("Sheet{}", self.sheets.len() + 1);
        }

        let mut candidate = base.clone();
        let mut counter = 2;
        while self.names.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({counter})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            candidate = format!("{}{suffix}", clip_sheet_name(&base, keep));
            counter += 1;
        }
        self.names.insert(candidate.to_lowercase());
        candidate
    }

    /// Write the workbook. An empty workbook gets a single empty sheet.
    pub fn build(&self) -> Result<Bytes, RenderError> {
        let fallback;
        let sheets: &[Sheet] = if self.sheets.is_empty() {
            fallback = [Sheet {
                name: "Report".to_string(),
                rows: Vec::new(),
            }];
            &fallback
        } else {
            &self.sheets
        };

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(content_types(sheets.len()).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(sheets).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(workbook_rels(sheets.len()).as_bytes())?;

        for (index, sheet) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
            zip.write_all(sheet_xml(sheet).as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>";

fn content_types(sheet_count: usize) -> String {
    let mut xml = format!(
        "{XML_HEADER}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>"
    );
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{n}.xml\" \
             ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut xml = format!(
        "{XML_HEADER}<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>"
    );
    for (index, sheet) in sheets.iter().enumerate() {
        let n = index + 1;
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{n}\" r:id=\"rId{n}\"/>",
            escape_html(&sheet.name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = format!(
        "{XML_HEADER}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
    );
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{n}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
             Target=\"worksheets/sheet{n}.xml\"/>"
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Spreadsheet column letters for a zero-based index: 0 is `A`, 26 is `AA`.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn sheet_xml(sheet: &Sheet) -> String {
    let mut xml = format!(
        "{XML_HEADER}<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>"
    );
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_number = r + 1;
        xml.push_str(&format!("<row r=\"{row_number}\">"));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_number}", column_name(c));
            match cell {
                Cell::Text(text) => xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    escape_html(text)
                )),
                Cell::Number(value) if value.is_finite() => {
                    xml.push_str(&format!("<c r=\"{reference}\"><v>{value}</v></c>"))
                }
                Cell::Number(_) => xml.push_str(&format!("<c r=\"{reference}\"/>")),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn stats() -> SnapshotStats {
        SnapshotStats {
            total_tasks: 3,
            completed_tasks: 2,
            todo_tasks: 1,
            working_tasks: 0,
            total_minutes: 600.0,
            total_hours: 10,
            avg_daily_hours: 2.0,
            completion_rate: 67,
            productivity_score: 77.0,
        }
    }

    fn read_entry(bytes: &Bytes, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("zip archive");
        let mut entry = archive.by_name(name).expect("entry present");
        let mut contents = String::new();
        entry.read_to_string(&mut contents).expect("utf-8 entry");
        contents
    }

    #[test]
    fn test_metrics_sheet_has_six_metrics_and_header() {
        let mut builder = WorkbookBuilder::new();
        builder.add_metrics_sheet("Alice", &stats());
        let bytes = builder.build().expect("workbook");

        let sheet = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet.matches("<row ").count(), 7);
        for label in [
            "Metric",
            "Total Tasks",
            "Completed Tasks",
            "To Do Tasks",
            "Working Tasks",
            "Total Hours",
            "Average Daily Hours",
        ] {
            assert!(sheet.contains(&format!("<t>{label}</t>")), "missing {label}");
        }
        assert!(sheet.contains("<c r=\"B6\"><v>10</v></c>"));
        assert!(read_entry(&bytes, "xl/workbook.xml").contains("name=\"Alice\""));
    }

    #[test]
    fn test_sheet_names_are_sanitised_and_unique() {
        let mut builder = WorkbookBuilder::new();
        builder
            .add_metrics_sheet("A/B: team?", &stats())
            .add_metrics_sheet("a_b_ team_", &stats())
            .add_metrics_sheet("An extremely long employee display name", &stats());
        let workbook = read_entry(&builder.build().expect("workbook"), "xl/workbook.xml");

        assert!(workbook.contains("name=\"A_B_ team_\""));
        assert!(workbook.contains("name=\"a_b_ team_ (2)\""));
        assert!(workbook.contains("name=\"An extremely long employee disp\""));
        assert_eq!(builder.sheets.len(), 3);
    }

    #[test]
    fn test_sheet_name_cut_never_leaves_an_edge_apostrophe() {
        let long = format!("{}'s weekly report", "x".repeat(30));
        let mut builder = WorkbookBuilder::new();
        builder
            .add_metrics_sheet(&long, &stats())
            .add_metrics_sheet(&long, &stats())
            .add_metrics_sheet("'Quoted' ", &stats())
            .add_metrics_sheet("''", &stats());

        let names: Vec<&str> = builder.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "x".repeat(30));
        assert_eq!(names[1], format!("{} (2)", "x".repeat(27)));
        assert_eq!(names[2], "Quoted");
        assert_eq!(names[3], "Sheet4");
        assert!(names.iter().all(|n| !n.starts_with('\'') && !n.ends_with('\'')));
        assert!(names.iter().all(|n| n.chars().count() <= MAX_SHEET_NAME));
    }

    #[test]
    fn test_empty_workbook_still_has_a_sheet() {
        let bytes = WorkbookBuilder::new().build().expect("workbook");
        assert!(read_entry(&bytes, "xl/workbook.xml").contains("name=\"Report\""));
        assert!(read_entry(&bytes, "[Content_Types].xml").contains("sheet1.xml"));
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }
}
