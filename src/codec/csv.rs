//! Read-only CSV ingestion.
//!
//! The first line names the columns; every following line becomes one
//! document whose event name is the row's first cell and whose value is an
//! object of the remaining cells, keyed by their column names in camelCase.
//! Cells are read as text; the numeric accessors of
//! [`ValueIn`](crate::ValueIn) parse them on demand.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::codec::csv::CsvSource;
//! use serde_wire::DocumentReader;
//!
//! let csv = CsvSource::parse("Symbol,Price,Day's Volume\nIII,479.4,2387043\n").unwrap();
//! let mut doc = csv.read_document().unwrap().unwrap();
//! let (event, row) = doc.read_event().unwrap();
//! assert_eq!(event.unwrap().to_string(), "III");
//! let row = row.into_value();
//! assert_eq!(row.get("daysVolume").and_then(|v| v.as_str()), Some("2387043"));
//! assert!(csv.read_document().unwrap().is_none());
//! ```

use crate::{DocumentIn, DocumentReader, Error, FieldKey, FieldMap, ReadDocument, Result, Value, WireType};
use parking_lot::Mutex;
use std::ops::Range;

/// Turns a column heading into a camelCase field name.
///
/// Apostrophes are dropped and every other non-alphanumeric character
/// separates words: `"Day's Volume"` becomes `"daysVolume"`.
#[must_use]
pub fn camel_case(heading: &str) -> String {
    let cleaned: String = heading.chars().filter(|&c| c != '\'').collect();
    let mut name = String::with_capacity(cleaned.len());
    for (i, word) in cleaned
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                name.extend(first.to_lowercase());
            } else {
                name.extend(first.to_uppercase());
            }
            name.push_str(chars.as_str());
        }
    }
    name
}

struct Row {
    span: Range<usize>,
    cells: Vec<String>,
}

/// Rows of a CSV text, handed out one document at a time.
pub struct CsvSource {
    columns: Vec<String>,
    rows: Vec<Row>,
    next: Mutex<usize>,
}

impl CsvSource {
    /// Parses the whole text up front.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] for an unterminated quoted cell or text
    /// after a closing quote.
    pub fn parse(text: &str) -> Result<Self> {
        let mut records = split_records(text)?.into_iter();
        let columns = records
            .next()
            .map(|header| header.cells.iter().map(|h| camel_case(h)).collect())
            .unwrap_or_default();
        Ok(CsvSource {
            columns,
            rows: records.collect(),
            next: Mutex::new(0),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            Error::malformed(
                bytes.get(e.valid_up_to()).copied(),
                e.valid_up_to(),
                "invalid UTF-8",
            )
        })?;
        Self::parse(text)
    }

    /// Field names derived from the header line.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns `true` while unread rows remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        *self.next.lock() < self.rows.len()
    }

    fn row_document(&self, row: &Row) -> ReadDocument {
        let mut cells = row.cells.iter();
        let event = cells.next().cloned().unwrap_or_default();
        let fields: FieldMap = self
            .columns
            .iter()
            .skip(1)
            .zip(cells)
            .map(|(column, cell)| (column.clone(), Value::Text(cell.clone())))
            .collect();
        let events = vec![(Some(FieldKey::Name(event)), Value::Object(fields))];
        ReadDocument::new(false, row.span.clone(), DocumentIn::new(events, WireType::Text))
    }
}

impl DocumentReader for CsvSource {
    fn read_document(&self) -> Result<Option<ReadDocument>> {
        let mut next = self.next.lock();
        let Some(row) = self.rows.get(*next) else {
            return Ok(None);
        };
        *next += 1;
        Ok(Some(self.row_document(row)))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cell {
    Start,
    Plain,
    Quoted,
    Closed,
}

fn split_records(text: &str) -> Result<Vec<Row>> {
    let mut records = Vec::new();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut state = Cell::Start;
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    let finish_cell = |cell: &mut String, state: Cell| -> String {
        let taken = std::mem::take(cell);
        if state == Cell::Plain {
            taken.trim().to_string()
        } else {
            taken
        }
    };

    while let Some((i, c)) = chars.next() {
        match (state, c) {
            (Cell::Quoted, '"') => {
                if matches!(chars.peek(), Some((_, '"'))) {
                    chars.next();
                    cell.push('"');
                } else {
                    state = Cell::Closed;
                }
            }
            (Cell::Quoted, _) => cell.push(c),
            (_, ',') => {
                cells.push(finish_cell(&mut cell, state));
                state = Cell::Start;
            }
            (_, '\n') => {
                cells.push(finish_cell(&mut cell, state));
                state = Cell::Start;
                let row = std::mem::take(&mut cells);
                if !(row.len() == 1 && row[0].is_empty()) {
                    records.push(Row {
                        span: start..i,
                        cells: row,
                    });
                }
                start = i + 1;
            }
            (_, '\r') => {}
            (Cell::Start, ' ' | '\t') => {}
            (Cell::Start, '"') => state = Cell::Quoted,
            (Cell::Start | Cell::Plain, _) => {
                cell.push(c);
                state = Cell::Plain;
            }
            (Cell::Closed, ' ' | '\t') => {}
            (Cell::Closed, _) => {
                return Err(Error::malformed(
                    text.as_bytes().get(i).copied(),
                    i,
                    "unexpected text after a closing quote",
                ));
            }
        }
    }
    if state == Cell::Quoted {
        return Err(Error::malformed(None, text.len(), "unterminated quoted cell"));
    }
    if state != Cell::Start || !cells.is_empty() {
        cells.push(finish_cell(&mut cell, state));
        records.push(Row {
            span: start..text.len(),
            cells,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Day's Volume"), "daysVolume");
        assert_eq!(camel_case("ChangePercent"), "changePercent");
        assert_eq!(camel_case("heading2"), "heading2");
        assert_eq!(camel_case(" last  trade-price "), "lastTradePrice");
    }

    #[test]
    fn test_quoted_cells() {
        let rows = split_records("a, \"b, c\" ,\"say \"\"hi\"\"\"\n\n x ,\"multi\nline\"").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(rows[1].cells, vec!["x", "multi\nline"]);
    }

    #[test]
    fn test_malformed_cells() {
        assert!(matches!(
            split_records("\"open"),
            Err(Error::MalformedInput { byte: None, .. })
        ));
        assert!(matches!(
            split_records("\"a\"b"),
            Err(Error::MalformedInput { byte: Some(b'b'), offset: 3, .. })
        ));
    }

    #[test]
    fn test_rows_become_documents() {
        let csv = CsvSource::parse(
            "heading1, heading2,heading3\ndata1, data2, \"data three\"\nrow2, row2b, row2c\n",
        )
        .unwrap();
        assert_eq!(csv.columns(), &["heading1", "heading2", "heading3"]);
        assert_eq!(csv.len(), 2);

        let mut doc = csv.read_document().unwrap().unwrap();
        assert!(!doc.is_meta_data());
        let (event, row) = doc.read_event().unwrap();
        assert_eq!(event, Some(FieldKey::Name("data1".into())));
        let fields = row.fields().unwrap();
        assert_eq!(fields[0].0, "heading2");
        assert_eq!(fields[1].1.text().unwrap(), "data three");

        assert!(csv.has_more());
        let mut doc = csv.read_document().unwrap().unwrap();
        assert_eq!(doc.read("row2").unwrap().fields().unwrap()[1].1.text().unwrap(), "row2c");
        assert!(!csv.has_more());
        assert!(csv.read_document().unwrap().is_none());
    }
}
