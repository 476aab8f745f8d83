// Dialect Detector
//
// Infers the field delimiter of a raw delimited-text header line.
// Candidates are tried in priority order; the one producing the most fields
// wins and ties keep the earlier candidate.

/// Candidate delimiters in tie-break priority order
pub const CANDIDATE_DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Split a line on `delimiter`, honoring double-quoted sections
///
/// Inside quotes the delimiter is literal text and a doubled quote (`""`)
/// is a literal quote character. Surrounding quotes are removed and each
/// field is trimmed.
pub fn split_quoted(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Detect the delimiter of a header line
pub fn detect_delimiter(line: &str) -> char {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;

    for candidate in CANDIDATE_DELIMITERS {
        let count = split_quoted(line, candidate).len();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_candidate() {
        assert_eq!(detect_delimiter("NAAB;Nome;TPI"), ';');
        assert_eq!(detect_delimiter("NAAB,Nome,TPI"), ',');
        assert_eq!(detect_delimiter("NAAB\tNome\tTPI"), '\t');
        assert_eq!(detect_delimiter("NAAB|Nome|TPI"), '|');
    }

    #[test]
    fn test_quoted_delimiters_are_literal() {
        // Three semicolon fields vs. two commas hidden inside quotes
        let line = r#""Name, full";"Sire, code";TPI"#;
        assert_eq!(detect_delimiter(line), ';');
        assert_eq!(
            split_quoted(line, ';'),
            vec!["Name, full", "Sire, code", "TPI"]
        );
    }

    #[test]
    fn test_doubled_quote_is_literal_quote() {
        let fields = split_quoted(r#""say ""hi""",b"#, ',');
        assert_eq!(fields, vec![r#"say "hi""#, "b"]);
    }

    #[test]
    fn test_tie_prefers_semicolon() {
        // One semicolon and one comma: both give two fields
        assert_eq!(detect_delimiter("a;b,c"), ';');
        // No delimiter at all: single field everywhere
        assert_eq!(detect_delimiter("header"), ';');
    }

    #[test]
    fn test_detection_is_deterministic() {
        let line = "NAAB,Nome;TPI,NM$|x";
        let first = detect_delimiter(line);
        for _ in 0..10 {
            assert_eq!(detect_delimiter(line), first);
        }
        assert_eq!(first, ',');
    }

    #[test]
    fn test_trailing_newline_ignored() {
        assert_eq!(split_quoted("a;b", ';').len(), 2);
        assert_eq!(detect_delimiter("a,b\r\n"), ',');
    }
}
