use std::fmt;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

/// Read a text file that may be UTF-8 or UTF-16 (Unicorn exports are UTF-16).
pub fn read_text(path: &Path) -> Result<String, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(&bytes)
}

/// Decode by byte-order mark; without one, try UTF-8 and fall back to UTF-16LE.
pub fn decode_bytes(bytes: &[u8]) -> Result<String, ImportError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16::<LittleEndian>(rest),
        [0xFE, 0xFF, rest @ ..] => decode_utf16::<BigEndian>(rest),
        [0xEF, 0xBB, 0xBF, rest @ ..] => std::str::from_utf8(rest)
            .map(str::to_owned)
            .map_err(|e| ImportError::Decode(e.to_string())),
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_owned()),
            Err(utf8_err) => {
                log::debug!("not UTF-8 ({utf8_err}), retrying as UTF-16LE");
                decode_utf16::<LittleEndian>(bytes)
            }
        },
    }
}

fn decode_utf16<B: ByteOrder>(bytes: &[u8]) -> Result<String, ImportError> {
    if bytes.len() % 2 != 0 {
        return Err(ImportError::Decode(format!(
            "UTF-16 data has odd length {}",
            bytes.len()
        )));
    }
    let mut units = vec![0u16; bytes.len() / 2];
    B::read_u16_into(bytes, &mut units);
    String::from_utf16(&units).map_err(|e| ImportError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Delimited tables
// ---------------------------------------------------------------------------

/// Field separator for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
    /// Any run of spaces or tabs.
    Whitespace,
}

impl Delimiter {
    pub const ALL: [Delimiter; 3] = [Delimiter::Tab, Delimiter::Comma, Delimiter::Whitespace];
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => write!(f, "Tab"),
            Delimiter::Comma => write!(f, "Comma"),
            Delimiter::Whitespace => write!(f, "Space"),
        }
    }
}

/// Split `text` into rows of cells. Blank lines are skipped; rows may differ in width.
pub fn read_rows(text: &str, delimiter: Delimiter) -> Result<Vec<Vec<String>>, ImportError> {
    let byte = match delimiter {
        Delimiter::Tab => b'\t',
        Delimiter::Comma => b',',
        Delimiter::Whitespace => {
            return Ok(text
                .lines()
                .map(|line| line.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
                .filter(|row| !row.is_empty())
                .collect());
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(byte)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(|c| c.trim().to_owned()).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// A table with named columns. Cells are kept as text until a mapping coerces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Headerless table; columns are named by their index.
    pub fn unheadered(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            headers: (0..width).map(|i| i.to_string()).collect(),
            rows,
        }
    }

    /// Promote row `header_row` to column names; rows above it are discarded.
    pub fn with_header(mut rows: Vec<Vec<String>>, header_row: usize) -> Result<Self, ImportError> {
        if header_row >= rows.len() {
            return Err(ImportError::EmptyFile);
        }
        let body = rows.split_off(header_row + 1);
        let mut headers = rows.pop().unwrap_or_default();
        let width = body
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        for i in headers.len()..width {
            headers.push(format!("Unnamed: {i}"));
        }
        Ok(Self {
            headers,
            rows: body,
        })
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// `Col i: header`, the label shown in column pickers.
    pub fn column_label(&self, col: usize) -> String {
        format!("Col {col}: {}", self.headers.get(col).map(String::as_str).unwrap_or(""))
    }

    /// Pairs of (column `a`, column `b`) cells for every row that has both.
    pub fn column_pairs(&self, a: usize, b: usize) -> impl Iterator<Item = (&str, &str)> {
        self.rows
            .iter()
            .filter_map(move |row| Some((row.get(a)?.as_str(), row.get(b)?.as_str())))
    }
}

/// Numeric coercion: blank, unparsable or non-finite cells become `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
