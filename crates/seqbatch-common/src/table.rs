//! Delimited metadata tables (CSV / TSV)
//!
//! A [`MetadataTable`] is a header row plus rectangular string rows. Tables are
//! never edited cell by cell; subsets are derived by filtering on a key column.

use crate::error::{FormatError, Result};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

/// Field delimiter of a tabular file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Other(u8),
}

impl Delimiter {
    /// Delimiter byte
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Other(b) => b,
        }
    }

    /// Guess the delimiter from a file extension (`.csv`, `.tsv`, `.tab`, `.txt`)
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Delimiter::Comma),
            "tsv" | "tab" | "txt" => Some(Delimiter::Tab),
            _ => None,
        }
    }
}

impl std::str::FromStr for Delimiter {
    type Err = FormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tab" | "\\t" | "\t" | "tsv" => Ok(Delimiter::Tab),
            "comma" | "," | "csv" => Ok(Delimiter::Comma),
            _ if s.len() == 1 => Ok(Delimiter::Other(s.as_bytes()[0])),
            _ => Err(FormatError::table(format!(
                "invalid delimiter '{}': use 'tab', 'comma' or a single character",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Comma => write!(f, "comma"),
            Delimiter::Tab => write!(f, "tab"),
            Delimiter::Other(b) => write!(f, "{}", *b as char),
        }
    }
}

/// Header row plus data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MetadataTable {
    /// Build a table, checking every row has one value per header
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(FormatError::table("table has no header row"));
        }

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(FormatError::table(format!(
                "row {} has {} fields, expected {}",
                i + 1,
                row.len(),
                headers.len()
            )));
        }

        Ok(Self { headers, rows })
    }

    /// Table with the same headers and no rows
    pub fn empty_like(&self) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: Vec::new(),
        }
    }

    /// Parse delimited text with a header row
    pub fn parse<R: Read>(reader: R, delimiter: Delimiter) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = String::from_utf8_lossy(h);
                // Spreadsheet exports often lead with a byte order mark
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.into_owned()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect(),
            );
        }

        Self::new(headers, rows)
    }

    /// Read a delimited file
    pub fn read_path(path: impl AsRef<Path>, delimiter: Delimiter) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| FormatError::io(path, e))?;
        Self::parse(std::io::BufReader::new(file), delimiter)
    }

    /// Write header and rows
    pub fn write<W: Write>(&self, writer: W, delimiter: Delimiter) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter.as_byte())
            .from_writer(writer);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .map_err(|e| FormatError::Csv(csv::Error::from(e)))?;
        Ok(())
    }

    /// Write to a file, replacing its contents
    pub fn write_path(&self, path: impl AsRef<Path>, delimiter: Delimiter) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| FormatError::io(path, e))?;
        self.write(std::io::BufWriter::new(file), delimiter)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| FormatError::MissingColumn {
                column: column.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Values of one column, in row order
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Stable sort of the rows by one column
    pub fn sort_by_column(&mut self, index: usize) {
        self.rows.sort_by(|a, b| a[index].cmp(&b[index]));
    }

    /// Rows whose key column value is in `keys`, keeping table order
    pub fn select_keys(&self, index: usize, keys: &HashSet<&str>) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keys.contains(row[index].as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Split rows into (`keys` matches, everything else), keeping table order
    pub fn partition_keys(&self, index: usize, keys: &HashSet<&str>) -> (Self, Self) {
        let (matched, rest): (Vec<_>, Vec<_>) = self
            .rows
            .iter()
            .cloned()
            .partition(|row| keys.contains(row[index].as_str()));

        (
            Self {
                headers: self.headers.clone(),
                rows: matched,
            },
            Self {
                headers: self.headers.clone(),
                rows: rest,
            },
        )
    }

    /// Append the rows of a table with identical headers
    pub fn append(&mut self, other: MetadataTable) -> Result<()> {
        if self.headers != other.headers {
            return Err(FormatError::table(format!(
                "cannot append rows with headers [{}] to a table with headers [{}]",
                other.headers.join(", "),
                self.headers.join(", ")
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> MetadataTable {
        MetadataTable::parse(
            "sample_id,province\nS3,ON\nS1,BC\nS2,AB\n".as_bytes(),
            Delimiter::Comma,
        )
        .unwrap()
    }

    #[test]
    fn test_delimiter_from_extension() {
        assert_eq!(Delimiter::from_extension("a.csv"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::from_extension("a.TSV"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::from_extension("a.xlsx"), None);
    }

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!(",".parse::<Delimiter>().unwrap(), Delimiter::Comma);
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::Other(b';'));
        assert!("semicolon".parse::<Delimiter>().is_err());
    }

    #[test]
    fn test_parse_and_column_index() {
        let table = sample();
        assert_eq!(table.headers(), &["sample_id", "province"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_index("province").unwrap(), 1);

        let err = table.column_index("specimen id").unwrap_err();
        match err {
            FormatError::MissingColumn { column, available } => {
                assert_eq!(column, "specimen id");
                assert_eq!(available, vec!["sample_id", "province"]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_strips_bom_and_keeps_quoted_delimiters() {
        let text = "\u{feff}id\tnote\nS1\t\"a\tb\"\n";
        let table = MetadataTable::parse(text.as_bytes(), Delimiter::Tab).unwrap();
        assert_eq!(table.headers()[0], "id");
        assert_eq!(table.rows()[0][1], "a\tb");
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let result = MetadataTable::parse("a,b\n1,2\n3\n".as_bytes(), Delimiter::Comma);
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_select_and_partition() {
        let mut table = sample();
        table.sort_by_column(0);
        let ids: Vec<&str> = table.column_values(0).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);

        let keys: HashSet<&str> = ["S3", "S1"].into_iter().collect();
        let selected = table.select_keys(0, &keys);
        let ids: Vec<&str> = selected.column_values(0).collect();
        assert_eq!(ids, vec!["S1", "S3"]);

        let (hit, rest) = table.partition_keys(0, &keys);
        assert_eq!(hit.len(), 2);
        assert_eq!(rest.column_values(0).collect::<Vec<_>>(), vec!["S2"]);
    }

    #[test]
    fn test_append_requires_matching_headers() {
        let mut table = sample();
        let other = MetadataTable::new(vec!["sample_id".into()], vec![vec!["S9".into()]]).unwrap();
        assert!(table.append(other).is_err());

        let same = table.empty_like();
        table.append(same).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_tsv_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.tsv");
        let table = sample();

        table.write_path(&path, Delimiter::Tab).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("sample_id\tprovince\n"));
        assert_eq!(MetadataTable::read_path(&path, Delimiter::Tab).unwrap(), table);
    }

    #[test]
    fn test_header_only_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tsv");
        let table = sample().empty_like();

        table.write_path(&path, Delimiter::Tab).unwrap();
        let back = MetadataTable::read_path(&path, Delimiter::Tab).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.headers(), table.headers());
    }
}
