//! Local CSV and token-list loading with encoding and delimiter auto-detection.
//!
//! The lookup tables handed to the transformers are exported by hand from
//! spreadsheets, so they arrive in whatever encoding and separator the
//! exporting tool chose. Everything is decoded to UTF-8 and parsed into a
//! normalized [`Table`].

use std::path::Path;

use crate::error::{TableError, TableResult};

use super::Table;

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        // encoding_rs treats ISO-8859-1 as its windows-1252 superset
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Ties and header-only single-column files resolve to a comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [b',', b';', b'\t', b'|'];
    let mut best_sep = b',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep as char).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_csv_bytes(bytes: &[u8]) -> TableResult<Table> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let content = content.trim_start_matches('\u{feff}');

    if content.trim().is_empty() {
        return Err(TableError::EmptyFile);
    }

    let delimiter = detect_delimiter(content);
    tracing::debug!(encoding = %encoding, delimiter = %(delimiter as char), "parsing CSV");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|c| c.trim().to_string()).collect());
    }

    Ok(Table::from_grid(grid))
}

/// Load a CSV file with a first-row header.
pub fn load_csv<P: AsRef<Path>>(path: P) -> TableResult<Table> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv_bytes(&bytes)
}

/// Load a flat list file: one token per line, blank lines ignored.
pub fn load_token_list<P: AsRef<Path>>(path: P) -> TableResult<Vec<String>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = decode_content(&bytes, &detect_encoding(&bytes));

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let table = parse_csv_bytes(b"name,age\nAlice,30\nBob,25").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "name"), "Alice");
        assert_eq!(table.get(0, "age"), "30");
        assert_eq!(table.get(1, "name"), "Bob");
    }

    #[test]
    fn test_quoted_values_with_delimiter() {
        let csv = "data table pht,participant ID phv,associated visit\n\"pht000009\",\"phv00000001\",\"Exam 1, baseline\"";
        let table = parse_csv_bytes(csv.as_bytes()).unwrap();

        assert_eq!(table.get(0, "associated visit"), "Exam 1, baseline");
    }

    #[test]
    fn test_header_whitespace_trimmed() {
        let table = parse_csv_bytes(b" data table pht , visit \npht1,v1").unwrap();
        assert_eq!(table.columns(), &["data table pht", "visit"]);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_csv_bytes(b"a;b\n1;2\n\n3;4\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = parse_csv_bytes(b"a;b;c\n1;;3").unwrap();

        assert_eq!(table.get(0, "a"), "1");
        assert_eq!(table.get(0, "b"), "");
        assert_eq!(table.get(0, "c"), "3");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv_bytes(b""), Err(TableError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_load_token_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "phv00001\n\n  phv00002  \nphv00003").unwrap();

        let tokens = load_token_list(file.path()).unwrap();
        assert_eq!(tokens, vec!["phv00001", "phv00002", "phv00003"]);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
