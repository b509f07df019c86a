//! Parsing pasted or file text into front/back pairs.
//!
//! One card per line. A line holding two or more `"quoted"` sections uses
//! the first two. Otherwise it is split on tabs, then commas, then
//! runs of whitespace, and the first two parts are taken. Leading
//! whitespace leaves an empty first part, which drops the line.

/// A parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedCard {
    pub front: String,
    pub back: String,
}

pub fn parse_cards(text: &str) -> Vec<ImportedCard> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse one line, `None` if it does not yield two non-empty sides.
pub fn parse_line(line: &str) -> Option<ImportedCard> {
    if line.trim().is_empty() {
        return None;
    }

    let quoted = quoted_sections(line);
    let (front, back) = if quoted.len() >= 2 {
        (quoted[0].trim(), quoted[1].trim())
    } else {
        let parts: Vec<&str> = if line.contains('\t') {
            line.split('\t').collect()
        } else if line.contains(',') {
            line.split(',').collect()
        } else {
            split_whitespace_runs(line)
        };
        if parts.len() < 2 {
            return None;
        }
        (unquote(parts[0].trim()), unquote(parts[1].trim()))
    };

    let (front, back) = (front.trim(), back.trim());
    if front.is_empty() || back.is_empty() {
        return None;
    }
    Some(ImportedCard {
        front: front.to_string(),
        back: back.to_string(),
    })
}

fn quoted_sections(line: &str) -> Vec<&str> {
    // Text between the 1st/2nd, 3rd/4th, ... quote characters.
    line.split('"').skip(1).step_by(2).take(line.matches('"').count() / 2).collect()
}

/// Split on runs of whitespace, keeping the empty part before leading blanks.
fn split_whitespace_runs(line: &str) -> Vec<&str> {
    let mut pieces = line.split(char::is_whitespace);
    let first = pieces.next().unwrap_or_default();
    std::iter::once(first)
        .chain(pieces.filter(|p| !p.is_empty()))
        .collect()
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(front: &str, back: &str) -> ImportedCard {
        ImportedCard {
            front: front.into(),
            back: back.into(),
        }
    }

    #[test]
    fn test_tab_separated() {
        assert_eq!(parse_line("hola\thello, there"), Some(pair("hola", "hello, there")));
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(parse_line(" gato , cat "), Some(pair("gato", "cat")));
    }

    #[test]
    fn test_whitespace_fallback() {
        assert_eq!(parse_line("perro   dog"), Some(pair("perro", "dog")));
    }

    #[test]
    fn test_leading_whitespace_drops_line() {
        assert_eq!(parse_line("  perro dog"), None);
        assert_eq!(parse_line("perro dog  "), Some(pair("perro", "dog")));
        assert_eq!(parse_line("perro \u{3000} dog"), Some(pair("perro", "dog")));
    }

    #[test]
    fn test_quoted_sections_win() {
        assert_eq!(
            parse_line(r#""Hello, world","Hola, mundo""#),
            Some(pair("Hello, world", "Hola, mundo"))
        );
        assert_eq!(
            parse_line(r#""a b" "c d" "e""#),
            Some(pair("a b", "c d"))
        );
    }

    #[test]
    fn test_single_quoted_side_is_unquoted() {
        assert_eq!(parse_line("\"uno\"\tone"), Some(pair("uno", "one")));
    }

    #[test]
    fn test_unusable_lines() {
        assert_eq!(parse_line("lonely"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("front,"), None);
        assert_eq!(parse_line(r#""","x""#), None);
    }

    #[test]
    fn test_parse_cards_skips_blank_and_bad_lines() {
        let text = "one\tuno\n\nbad\ntwo,dos\n";
        assert_eq!(parse_cards(text), vec![pair("one", "uno"), pair("two", "dos")]);
    }
}
