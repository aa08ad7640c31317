use crate::error::{Result, SatchelError};

use super::options::CsvParsingOptions;

/// Header row + data rows, after delimiter splitting and header resolution.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Split raw bytes into records per the configured delimiter and header row.
///
/// Blank lines are skipped and ragged rows are tolerated; short rows surface
/// as absent values downstream rather than as a parse failure. Hard failures:
/// zero records, or a header row index past the end of the file.
pub fn parse_csv_buffer(buffer: &[u8], options: &CsvParsingOptions) -> Result<ParsedCsv> {
    let records = if options.delimiter.as_bytes().len() == 1 {
        read_with_csv_reader(buffer, options.delimiter.as_bytes()[0])?
    } else {
        read_with_split(buffer, &options.delimiter)
    };

    if records.is_empty() {
        return Err(SatchelError::Parse("CSV contained no records".to_string()));
    }

    if options.has_headers {
        if options.header_row_index >= records.len() {
            return Err(SatchelError::Parse(format!(
                "Header row index {} is out of range ({} records)",
                options.header_row_index,
                records.len()
            )));
        }
        let headers = records[options.header_row_index]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = records[options.header_row_index + 1..].to_vec();
        Ok(ParsedCsv { headers, rows })
    } else {
        let width = records.iter().map(Vec::len).max().unwrap_or(0);
        let headers = (1..=width).map(|i| format!("Column {i}")).collect();
        Ok(ParsedCsv { headers, rows: records })
    }
}

fn read_with_csv_reader(buffer: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(buffer);
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

// Multi-character delimiters are outside what the csv crate supports; plain
// line splitting, no quoting rules.
fn read_with_split(buffer: &[u8], delimiter: &str) -> Vec<Vec<String>> {
    String::from_utf8_lossy(buffer)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(delimiter).map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::options::{DateFormat, DirectionMode};

    fn options(delimiter: &str, has_headers: bool, header_row_index: usize) -> CsvParsingOptions {
        CsvParsingOptions {
            delimiter: delimiter.to_string(),
            has_headers,
            header_row_index,
            date_format: DateFormat::YearMonthDay,
            decimal_separator: '.',
            thousands_separator: ',',
            direction_mode: DirectionMode::SignBased,
        }
    }

    #[test]
    fn test_parse_with_headers() {
        let csv = b"Date,Amount,Description\n2025-01-01,10.00,Coffee\n2025-01-02,20.00,Lunch\n";
        let parsed = parse_csv_buffer(csv, &options(",", true, 0)).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Amount", "Description"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0][2], "Coffee");
    }

    #[test]
    fn test_parse_header_row_offset() {
        let csv = b"Bank export\n\nDate,Amount\n2025-01-01,10.00\n";
        let parsed = parse_csv_buffer(csv, &options(",", true, 1)).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Amount"]);
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_parse_header_row_out_of_range() {
        let csv = b"Date,Amount\n2025-01-01,10.00\n";
        let err = parse_csv_buffer(csv, &options(",", true, 9)).unwrap_err();
        assert!(matches!(err, SatchelError::Parse(_)));
    }

    #[test]
    fn test_parse_empty_buffer_fails() {
        let err = parse_csv_buffer(b"", &options(",", true, 0)).unwrap_err();
        assert!(matches!(err, SatchelError::Parse(_)));
        let err = parse_csv_buffer(b"\n\n\n", &options(",", false, 0)).unwrap_err();
        assert!(matches!(err, SatchelError::Parse(_)));
    }

    #[test]
    fn test_synthesized_headers_sized_to_widest_row() {
        let csv = b"a,b\nc,d,e,f\ng\n";
        let parsed = parse_csv_buffer(csv, &options(",", false, 0)).unwrap();
        assert_eq!(
            parsed.headers,
            vec!["Column 1", "Column 2", "Column 3", "Column 4"]
        );
        assert_eq!(parsed.rows.len(), 3);
    }

    #[test]
    fn test_ragged_rows_tolerated() {
        let csv = b"Date,Amount,Description\n2025-01-01,10.00\n2025-01-02,20.00,Lunch,extra\n";
        let parsed = parse_csv_buffer(csv, &options(",", true, 0)).unwrap();
        assert_eq!(parsed.rows[0].len(), 2);
        assert_eq!(parsed.rows[1].len(), 4);
    }

    #[test]
    fn test_quoted_fields_with_embedded_delimiter() {
        let csv = b"Description,Amount\n\"Rent, January\",100.00\n";
        let parsed = parse_csv_buffer(csv, &options(",", true, 0)).unwrap();
        assert_eq!(parsed.rows[0][0], "Rent, January");
    }

    #[test]
    fn test_tab_delimiter() {
        let csv = b"Date\tAmount\n2025-01-01\t10.00\n";
        let parsed = parse_csv_buffer(csv, &options("\t", true, 0)).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Amount"]);
        assert_eq!(parsed.rows[0][1], "10.00");
    }

    #[test]
    fn test_multichar_delimiter() {
        let csv = b"Date||Amount\n2025-01-01||10.00\n";
        let parsed = parse_csv_buffer(csv, &options("||", true, 0)).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Amount"]);
        assert_eq!(parsed.rows[0], vec!["2025-01-01", "10.00"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = b"Date,Amount\n\n2025-01-01,10.00\n,,\n2025-01-02,20.00\n";
        let parsed = parse_csv_buffer(csv, &options(",", true, 0)).unwrap();
        assert_eq!(parsed.rows.len(), 2);
    }
}
