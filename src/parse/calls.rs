//! Call-site location within a logical line.

/// Find `prefix` followed by a call, skipping quoted strings, and return the
/// byte offsets of `(prefix_start, open_paren, matching_close_paren)`.
///
/// The match is the first occurrence of `prefix` outside string literals
/// whose next non-space character opens a parenthesis. `None` when the
/// prefix never introduces a call or the parentheses never balance.
pub fn find_call_parens(text: &str, prefix: &str) -> Option<(usize, usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                in_string = Some(b);
                i += 1;
            }
            b'#' => {
                // Comment runs to the end of the physical line.
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => {
                if text[i..].starts_with(prefix) {
                    let mut j = i + prefix.len();
                    while j < bytes.len() && bytes[j] == b' ' {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j] == b'(' {
                        if let Some(close) = matching_close(text, j) {
                            return Some((i, j, close));
                        }
                        return None;
                    }
                }
                i += 1;
            }
        }
    }
    None
}

/// Byte offset of the `)` matching the `(` at `open`, string-aware.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => in_string = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_call() {
        let text = "name = dlg.getOpenFileName(self, 'Open')";
        let (start, open, close) = find_call_parens(text, ".getOpenFileName").unwrap();
        assert_eq!(&text[start..open], ".getOpenFileName");
        assert_eq!(&text[open..=close], "(self, 'Open')");
    }

    #[test]
    fn nested_parens_balance() {
        let text = "x = f(g(1, 2), h(3))";
        let (_, open, close) = find_call_parens(text, "f").unwrap();
        assert_eq!(&text[open..=close], "(g(1, 2), h(3))");
    }

    #[test]
    fn parens_inside_strings_ignored() {
        let text = "x = _fromUtf8('a)b(c')";
        let (_, open, close) = find_call_parens(text, "_fromUtf8").unwrap();
        assert_eq!(&text[open..=close], "('a)b(c')");
    }

    #[test]
    fn prefix_inside_string_not_matched() {
        assert!(find_call_parens("x = '_fromUtf8(y)'", "_fromUtf8").is_none());
    }

    #[test]
    fn no_call_after_prefix() {
        assert!(find_call_parens("x = _fromUtf8", "_fromUtf8").is_none());
    }
}
