/// A fenced code block extracted from a chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fenced {
    /// Language tag following the opening fence, lowercased; empty when
    /// the block is untagged.
    pub tag: String,
    /// Verbatim body between the fences.
    pub body: String,
}

/// Extracts the first triple-backtick fenced block from `text`.
///
/// The tag is the run of non-whitespace right after the opening fence,
/// ending at the first newline. A block without a newline, or whose
/// first line is not a single token, is untagged and all body.
pub fn parse_fenced(text: &str) -> Option<Fenced> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let end = after.find("```")?;
    let inner = &after[..end];

    let (tag, body) = match inner.split_once('\n') {
        Some((first, rest)) => {
            let candidate = first.trim();
            if candidate.is_empty() || candidate.contains(char::is_whitespace) {
                (String::new(), inner.to_string())
            } else {
                (candidate.to_ascii_lowercase(), rest.to_string())
            }
        }
        None => (String::new(), inner.to_string()),
    };
    Some(Fenced { tag, body })
}

/// Renders a fenced block tagged with `tag`.
pub fn render_fenced(tag: &str, body: &str) -> String {
    format!("```{tag}\n{body}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_block() {
        let fenced = parse_fenced("here you go ```python\nprint(1)``` thanks").unwrap();
        assert_eq!(fenced.tag, "python");
        assert_eq!(fenced.body, "print(1)");
    }

    #[test]
    fn test_tag_is_lowercased() {
        let fenced = parse_fenced("```Python\nprint(1)\n```").unwrap();
        assert_eq!(fenced.tag, "python");
    }

    #[test]
    fn test_single_line_block_is_untagged() {
        let fenced = parse_fenced("```print(1)```").unwrap();
        assert_eq!(fenced.tag, "");
        assert_eq!(fenced.body, "print(1)");
    }

    #[test]
    fn test_first_line_with_spaces_is_code_not_tag() {
        let fenced = parse_fenced("```let x = 1\nx```").unwrap();
        assert_eq!(fenced.tag, "");
        assert_eq!(fenced.body, "let x = 1\nx");
    }

    #[test]
    fn test_no_fence_is_none() {
        assert!(parse_fenced("just words").is_none());
        assert!(parse_fenced("``not enough ticks``").is_none());
        assert!(parse_fenced("```unclosed").is_none());
    }

    #[test]
    fn test_render_roundtrip() {
        let rendered = render_fenced("rust", "fn main() {}");
        let fenced = parse_fenced(&rendered).unwrap();
        assert_eq!(fenced.tag, "rust");
        assert_eq!(fenced.body.trim(), "fn main() {}");
    }
}
