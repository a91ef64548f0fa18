use crate::client::Record;
use crate::{Error, Result};
use std::fmt::Write as _;

/// Column order shared by the CSV and JSON exports
pub const COLUMNS: [&str; 7] = [
    "Title", "Authors", "Journal", "Year", "Link", "Source", "Relevance",
];

/// Output format for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::invalid_input(
                "format",
                format!("unknown format '{other}' (expected table, json or csv)"),
            )),
        }
    }
}

impl ExportFormat {
    pub fn render(self, records: &[Record]) -> Result<String> {
        match self {
            Self::Table => Ok(to_table(records)),
            Self::Json => to_json(records),
            Self::Csv => to_csv(records),
        }
    }
}

/// CSV with a header row, even when there are no records
pub fn to_csv(records: &[Record]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::invalid_input("records", e.to_string()))
}

/// JSON array of objects, indented by two spaces
pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// One card per record, for terminals
#[must_use]
pub fn to_table(records: &[Record]) -> String {
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        let relevance = record
            .relevance
            .map_or_else(|| "-".to_string(), |score| format!("{score}%"));

        // Writing into a String cannot fail
        let _ = writeln!(out, "{:>3}. {}", index + 1, record.title);
        let _ = writeln!(out, "     Authors: {}", record.authors);
        let _ = writeln!(out, "     Journal: {} ({})", record.venue, record.year);
        let _ = writeln!(out, "     Source:  {} | Relevance: {}", record.source, relevance);
        let _ = writeln!(out, "     Link:    {}", record.link);
        out.push('\n');
    }
    out
}
