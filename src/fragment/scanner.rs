#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opener at `start`; returns the tag and the index of the closing `$`.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        // `$1$` is two numbered placeholders' worth of noise, not a tag
        if tag.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        Some((tag, idx))
    } else {
        None
    }
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end].starts_with(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

/// Split `sql` into the text around each `?` marker that sits outside string
/// literals, quoted identifiers, comments and dollar-quoted bodies.
///
/// Always returns at least one segment.
pub(super) fn split_placeholders(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut state = State::Normal;
    let mut segment_start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, closing)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = closing;
                    }
                }
                // `?` is ASCII, so both slice bounds are char boundaries
                b'?' => {
                    segments.push(sql[segment_start..idx].to_owned());
                    segment_start = idx + 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }

        idx += 1;
    }

    segments.push(sql[segment_start..].to_owned());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_bare_markers() {
        assert_eq!(
            split_placeholders("insert into t values (?, ?)"),
            vec!["insert into t values (", ", ", ")"]
        );
        assert_eq!(split_placeholders("select 1"), vec!["select 1"]);
        assert_eq!(split_placeholders(""), vec![""]);
        assert_eq!(split_placeholders("?"), vec!["", ""]);
    }

    #[test]
    fn skips_literals_and_comments() {
        let sql = "select '?', \"a?\" -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        let segments = split_placeholders(sql);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], "");
    }

    #[test]
    fn escaped_quote_does_not_end_literal() {
        let segments = split_placeholders("select 'it''s ?' , ?");
        assert_eq!(segments, vec!["select 'it''s ?' , ", ""]);
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let segments = split_placeholders("$fn$ select ? $fn$ where a = ?");
        assert_eq!(segments, vec!["$fn$ select ? $fn$ where a = ", ""]);
    }

    #[test]
    fn unicode_text_is_preserved() {
        let segments = split_placeholders("select 'é' as ü, ? as n");
        assert_eq!(segments, vec!["select 'é' as ü, ", " as n"]);
    }
}
