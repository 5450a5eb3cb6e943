//! Raw tabular input.

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{EngineError, EngineResult};

/// A header row plus string cells, as read from the input file.
///
/// Headers are trimmed. Short rows are padded with empty cells so every row has
/// one cell per header. Cells that were not valid UTF-8 hold a lossy decoding and
/// are listed by [`RawDataset::undecodable_cells`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    undecodable: BTreeMap<usize, Vec<usize>>,
}

impl RawDataset {
    /// Builds a dataset from in-memory headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self {
            headers,
            rows,
            undecodable: BTreeMap::new(),
        }
    }

    /// Reads a CSV document with a header row.
    ///
    /// Rows may have fewer or more cells than the header; fully blank lines are
    /// ignored. A cell that is not valid UTF-8 does not fail the read: it is
    /// kept lossily decoded and reported through
    /// [`undecodable_cells`](Self::undecodable_cells), so only its row is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use payslip_engine::validation::RawDataset;
    ///
    /// let data = "employeeId,name\nE1,Jane Doe\n";
    /// let dataset = RawDataset::from_csv(data.as_bytes()).unwrap();
    /// assert_eq!(dataset.headers(), ["employeeId", "name"]);
    /// assert_eq!(dataset.row_count(), 1);
    /// ```
    pub fn from_csv<R: Read>(reader: R) -> EngineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .map_err(|e| EngineError::Dataset {
                message: e.to_string(),
            })?
            .iter()
            .map(|cell| {
                std::str::from_utf8(cell)
                    .map(str::to_string)
                    .map_err(|e| EngineError::Dataset {
                        message: format!("header row is not valid UTF-8: {e}"),
                    })
            })
            .collect::<EngineResult<Vec<String>>>()?;

        let mut rows = Vec::new();
        let mut undecodable = BTreeMap::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| EngineError::Dataset {
                message: e.to_string(),
            })?;
            if record.iter().all(|cell| cell.trim_ascii().is_empty()) {
                continue;
            }

            let mut bad_cells = Vec::new();
            let cells: Vec<String> = record
                .iter()
                .enumerate()
                .map(|(index, cell)| match std::str::from_utf8(cell) {
                    Ok(text) => text.to_string(),
                    Err(_) => {
                        bad_cells.push(index);
                        String::from_utf8_lossy(cell).into_owned()
                    }
                })
                .collect();

            if !bad_cells.is_empty() {
                undecodable.insert(rows.len(), bad_cells);
            }
            rows.push(cells);
        }

        Ok(Self {
            undecodable,
            ..Self::new(headers, rows)
        })
    }

    /// Column names in input order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in input order.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Indices of the cells in `row` that were not valid UTF-8.
    pub fn undecodable_cells(&self, row: usize) -> &[usize] {
        self.undecodable.get(&row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of the named column, matched exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_trims_headers_and_bom() {
        let data = "\u{feff}employeeId , name\nE1,Jane\n";
        let dataset = RawDataset::from_csv(data.as_bytes()).unwrap();
        assert_eq!(dataset.headers(), ["employeeId", "name"]);
        assert_eq!(dataset.column_index("name"), Some(1));
    }

    #[test]
    fn test_from_csv_pads_short_rows() {
        let data = "a,b,c\n1\n";
        let dataset = RawDataset::from_csv(data.as_bytes()).unwrap();
        assert_eq!(dataset.rows()[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_from_csv_skips_blank_lines() {
        let data = "a,b\n1,2\n,\n3,4\n";
        let dataset = RawDataset::from_csv(data.as_bytes()).unwrap();
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn test_from_csv_keeps_quoted_commas() {
        let data = "name,grossIncome\n\"Doe, Jane\",\"1,000.00\"\n";
        let dataset = RawDataset::from_csv(data.as_bytes()).unwrap();
        assert_eq!(dataset.rows()[0], vec!["Doe, Jane", "1,000.00"]);
    }

    #[test]
    fn test_column_lookup_is_case_sensitive() {
        let dataset = RawDataset::new(vec!["employeeId".to_string()], vec![]);
        assert_eq!(dataset.column_index("employeeId"), Some(0));
        assert_eq!(dataset.column_index("EmployeeId"), None);
    }

    #[test]
    fn test_from_csv_keeps_rows_around_undecodable_cell() {
        let mut data = b"employeeId,name\nE1,Jane\nE2,Ren".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b"\nE3,Ann\n");

        let dataset = RawDataset::from_csv(data.as_slice()).unwrap();

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.rows()[1][0], "E2");
        assert!(dataset.rows()[1][1].starts_with("Ren"));
        assert_eq!(dataset.undecodable_cells(1), [1]);
        assert!(dataset.undecodable_cells(0).is_empty());
        assert!(dataset.undecodable_cells(2).is_empty());
    }
}
