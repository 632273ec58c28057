//! Delimited file content with quoted fields.
//!
//! A double quote toggles an "inside quotes" flag; commas inside quotes do
//! not split. Quote characters themselves are dropped. Escaped quotes (`""`)
//! get no special treatment: they simply toggle twice.

/// Split one line into trimmed fields.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(ch),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse file content into rows. Blank lines are dropped; `\r\n` is accepted.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_comma() {
        assert_eq!(parse_line(r#"a,"b,c",d"#), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_trailing_empty_field() {
        assert_eq!(parse_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_whitespace_trimmed_outside_and_inside() {
        assert_eq!(parse_line(r#" a , " b " "#), vec!["a", "b"]);
    }

    #[test]
    fn test_doubled_quotes_toggle() {
        assert_eq!(parse_line(r#""say ""hi""",x"#), vec!["say hi", "x"]);
    }

    #[test]
    fn test_rows_preserve_order_and_skip_blank() {
        let rows = parse_rows("name,price\r\nWidget,\"1,000\"\r\n\r\nGadget,5\n");
        assert_eq!(
            rows,
            vec![
                vec!["name", "price"],
                vec!["Widget", "1,000"],
                vec!["Gadget", "5"],
            ]
        );
    }
}
