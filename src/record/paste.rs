//! Pasted text rows: one row per line, cells separated by commas.
//!
//! No quoting rules apply here; use [`super::csv`] for file content.

/// Split pasted text into rows of trimmed cells. Blank lines are dropped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

/// Split a single-line list (e.g. product URLs) on commas and newlines.
pub fn parse_list(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split text into trimmed, non-blank lines; commas stay inside a line.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows("Widget, 10 ,http://img\n\n  Gadget,20,\n");
        assert_eq!(
            rows,
            vec![
                vec!["Widget", "10", "http://img"],
                vec!["Gadget", "20", ""],
            ]
        );
    }

    #[test]
    fn test_quotes_are_not_special() {
        let rows = parse_rows(r#"a,"b,c",d"#);
        assert_eq!(rows[0].len(), 4);
    }

    #[test]
    fn test_parse_list() {
        let items = parse_list("https://a/1, https://a/2,\nhttps://a/3,,");
        assert_eq!(items, vec!["https://a/1", "https://a/2", "https://a/3"]);
    }

    #[test]
    fn test_parse_lines_keeps_commas() {
        let items = parse_lines("Samsung Galaxy S24, 256GB\n\n  Pixel 8 \r\n");
        assert_eq!(items, vec!["Samsung Galaxy S24, 256GB", "Pixel 8"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_rows("  \n \n").is_empty());
        assert!(parse_list(" , ").is_empty());
        assert!(parse_lines(" \n\t\n").is_empty());
    }
}
