/// Upper bound on text fed to an embedding model or used as a query.
pub const MAX_QUERY_CHARS: usize = 12_000;

/// Collapse whitespace runs to single spaces, trim, and cap at `max_chars`
/// characters.
pub fn clean_text(value: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(value.len().min(max_chars));
    let mut count = 0usize;
    for word in value.split_whitespace() {
        if count > 0 {
            if count >= max_chars {
                break;
            }
            out.push(' ');
            count += 1;
        }
        for ch in word.chars() {
            if count >= max_chars {
                break;
            }
            out.push(ch);
            count += 1;
        }
    }
    // A cut right after a separator leaves a dangling space.
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text("  hello \n\t world  ", 100), "hello world");
    }

    #[test]
    fn empty_and_blank_input() {
        assert_eq!(clean_text("", 10), "");
        assert_eq!(clean_text(" \n \t ", 10), "");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(clean_text("héllo wörld", 7), "héllo w");
        assert_eq!(clean_text("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn truncation_never_ends_in_space() {
        assert_eq!(clean_text("abc def", 4), "abc");
    }

    #[test]
    fn zero_limit_is_empty() {
        assert_eq!(clean_text("abc", 0), "");
    }
}
