//! Balanced-Argument Splitter.
//!
//! Splits the inner text of a parenthesized call on top-level commas.
//! Bracketed groups and quoted strings are atomic, and a `lambda ...:`
//! expression stays one argument through its own parameter commas until its
//! colon is seen.

/// Split `input` (the text between a call's parentheses) into trimmed
/// top-level arguments. All-whitespace input yields an empty list.
pub fn split_arguments(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut slices: Vec<String> = vec![String::new()];
    let mut depth = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ',' if depth == 0 => {
                slices.push(String::new());
                i += 1;
                continue;
            }
            '\'' | '"' => {
                i = copy_string(&chars, i, slices.last_mut().unwrap());
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        slices.last_mut().unwrap().push(c);
        i += 1;
    }

    // Re-join a lambda's parameter list: the expression runs until its colon.
    let mut result: Vec<String> = Vec::with_capacity(slices.len());
    let mut idx = 0usize;
    while idx < slices.len() {
        if slices[idx].contains("lambda ") || slices[idx].trim() == "lambda" {
            let mut joined = String::new();
            while idx < slices.len() {
                if joined.is_empty() {
                    joined.push_str(&slices[idx]);
                } else {
                    joined.push(',');
                    joined.push_str(&slices[idx]);
                }
                if slices[idx].contains(':') {
                    break;
                }
                idx += 1;
            }
            result.push(joined);
        } else {
            result.push(slices[idx].clone());
        }
        idx += 1;
    }

    if result.len() == 1 && result[0].trim().is_empty() {
        return Vec::new();
    }

    result.iter().map(|s| s.trim().to_string()).collect()
}

/// Copy a quoted string verbatim into `out`; returns the index just past the
/// closing quote (or the end of input when unterminated).
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        if c == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == quote {
            return i + 1;
        }
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_top_level_commas() {
        assert_eq!(split_arguments("a, b, c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn nested_call_is_atomic() {
        assert_eq!(split_arguments("a, f(b, c), d"), vec!["a", "f(b, c)", "d"]);
    }

    #[test]
    fn quoted_string_is_atomic() {
        assert_eq!(split_arguments("'x,y', z"), vec!["'x,y'", "z"]);
        assert_eq!(split_arguments(r#""a(b", c"#), vec![r#""a(b""#, "c"]);
    }

    #[test]
    fn lambda_runs_to_its_colon() {
        assert_eq!(
            split_arguments("a, f(b, c), 'x,y', lambda x, y: x+y"),
            vec!["a", "f(b, c)", "'x,y'", "lambda x, y: x+y"]
        );
    }

    #[test]
    fn bare_lambda() {
        assert_eq!(
            split_arguments("sig, lambda: self.go()"),
            vec!["sig", "lambda: self.go()"]
        );
    }

    #[test]
    fn whitespace_input_is_empty() {
        assert_eq!(split_arguments(""), Vec::<String>::new());
        assert_eq!(split_arguments("   "), Vec::<String>::new());
    }

    #[test]
    fn signal_call_arguments() {
        assert_eq!(
            split_arguments(r#"self.button, SIGNAL("clicked(bool)"), self.on_click"#),
            vec!["self.button", r#"SIGNAL("clicked(bool)")"#, "self.on_click"]
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_string() {
        assert_eq!(split_arguments(r"'a\'b,c', d"), vec![r"'a\'b,c'", "d"]);
    }
}
