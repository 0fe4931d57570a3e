//! Tabular export parser with encoding and delimiter auto-detection.
//!
//! Turns raw export bytes into rows keyed by raw header label. Tolerates
//! UTF-8 and UTF-16 byte-order marks (ad editor exports are usually UTF-16
//! tab-separated). No campaign-specific logic here.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// One data row: raw header label → cell value.
pub type Row = HashMap<String, String>;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Data rows, header excluded
    pub rows: Vec<Row>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers in file order
    pub headers: Vec<String>,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Detect the encoding of raw bytes: BOM first, then chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(UTF8_BOM) {
        return "utf-8".to_string();
    }
    if bytes.starts_with(UTF16LE_BOM) {
        return "utf-16le".to_string();
    }
    if bytes.starts_with(UTF16BE_BOM) {
        return "utf-16be".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "utf-16le" => "utf-16le".to_string(),
        "utf-16be" => "utf-16be".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding, dropping any BOM.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => encoding_rs::UTF_8.decode_with_bom_removal(bytes).0,
        "utf-16le" => encoding_rs::UTF_16LE.decode_with_bom_removal(bytes).0,
        "utf-16be" => encoding_rs::UTF_16BE.decode_with_bom_removal(bytes).0,
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0,
        label => {
            let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| CsvError::EncodingError(format!("unsupported encoding '{}'", label)))?;
            encoding.decode(bytes).0
        }
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse decoded content with an explicit delimiter.
///
/// Returns the trimmed headers and the data rows. Rows whose cells are all
/// empty are kept so positions stay aligned with the file's data records.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<Row>)> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter = u8::try_from(delimiter)
        .map_err(|_| CsvError::ParseError { line: 1, message: format!("unsupported delimiter '{}'", delimiter) })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::ParseError { line: 1, message: e.to_string() })?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CsvError::ParseError {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 2),
            message: e.to_string(),
        })?;

        let mut row = Row::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = record.get(i).map(str::trim).unwrap_or("");
            // First column wins on duplicate header labels
            row.entry(header.clone()).or_insert_with(|| value.to_string());
        }

        rows.push(row);
    }

    Ok((headers, rows))
}

/// Whether every cell of `row` is empty.
pub fn is_blank_row(row: &Row) -> bool {
    row.values().all(|v| v.trim().is_empty())
}

/// Parse export bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse an export file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let (headers, rows) = parse_str("Campaign,Ad Group\nSpring,Shoes\nSpring,Boots", ',').unwrap();

        assert_eq!(headers, vec!["Campaign", "Ad Group"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Campaign"], "Spring");
        assert_eq!(rows[1]["Ad Group"], "Boots");
    }

    #[test]
    fn test_quoted_values_with_delimiter() {
        let csv = "Campaign,Description 1\n\"Spring\",\"Shop now, save more.\"";
        let (_, rows) = parse_str(csv, ',').unwrap();

        assert_eq!(rows[0]["Campaign"], "Spring");
        assert_eq!(rows[0]["Description 1"], "Shop now, save more.");
    }

    #[test]
    fn test_empty_rows_keep_their_position() {
        let (_, rows) = parse_str("a;b\n1;2\n;\n3;4\n", ';').unwrap();

        assert_eq!(rows.len(), 3);
        assert!(is_blank_row(&rows[1]));
        assert!(!is_blank_row(&rows[2]));
        assert_eq!(rows[2]["a"], "3");
    }

    #[test]
    fn test_short_rows_padded() {
        let (_, rows) = parse_str("a;b;c\n1;;3\n4", ';').unwrap();

        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["a"], "4");
        assert_eq!(rows[1]["c"], "");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_blank_header_error() {
        assert!(matches!(parse_str(",,\n1,2,3", ','), Err(CsvError::NoHeaders)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("campaign\nSpring"), ',');
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Campaign,Ad Group\nSpring,Shoes");
        let result = parse_bytes_auto(&bytes).unwrap();

        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.headers[0], "Campaign");
        assert_eq!(result.rows[0]["Campaign"], "Spring");
    }

    #[test]
    fn test_utf16le_tab_export() {
        let text = "Campaign\tAd group\nSpring Sale\tShoes\n";
        let mut bytes = UTF16LE_BOM.to_vec();
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }

        let result = parse_bytes_auto(&bytes).unwrap();
        assert_eq!(result.encoding, "utf-16le");
        assert_eq!(result.delimiter, '\t');
        assert_eq!(result.rows[0]["Campaign"], "Spring Sale");
        assert_eq!(result.rows[0]["Ad group"], "Shoes");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(matches!(
            decode_content(b"abc", "klingon-8"),
            Err(CsvError::EncodingError(_))
        ));
    }
}
