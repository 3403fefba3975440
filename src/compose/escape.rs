//! Markup escaping and literal-block layout for transcription text.
//!
//! Transcribed text is posted verbatim, so every character the forum's
//! markdown renderer treats specially has to be neutralized before posting:
//!
//! - formatting characters (`\`, `*`, `_`, `#`, `>`)
//! - autolink triggers for reserved name prefixes, in both their single-prefix
//!   form (`u/name`) and double-prefix form (`/u/name`)
//!
//! The prefix letters are a product configuration detail, so [`EscapeRules`]
//! compiles them into its autolink pattern at construction time.

use regex::{Captures, Regex};

/// Characters escaped by prefixing a backslash.
///
/// The backslash itself is part of the set; the escape pass is a single
/// left-to-right sweep, so the backslashes it inserts are never revisited.
const ESCAPED_CHARS: &[char] = &['\\', '*', '_', '#', '>'];

/// The indent used for literal blocks (markdown indented code blocks).
const BLOCK_INDENT: &str = "    ";

/// Escaping configuration: which name prefixes the forum autolinks.
///
/// On Reddit this is `u` (user mentions) and `r` (subreddit mentions).
#[derive(Debug, Clone)]
pub struct EscapeRules {
    autolink: Option<Regex>,
}

impl EscapeRules {
    /// Builds rules for the given autolink prefix letters (e.g. `"ur"`).
    ///
    /// An empty prefix set disables autolink neutralization entirely.
    pub fn new(prefixes: &str) -> Result<Self, regex::Error> {
        if prefixes.is_empty() {
            return Ok(EscapeRules { autolink: None });
        }

        // Matches `x/name` optionally preceded by a slash. Which of the two
        // forms matched decides where the escaped slash is inserted.
        let pattern = format!(
            r"(?P<lead>/)?(?P<prefix>[{}])/(?P<name>\S+)",
            regex::escape(prefixes)
        );
        Ok(EscapeRules {
            autolink: Some(Regex::new(&pattern)?),
        })
    }
}

impl Default for EscapeRules {
    fn default() -> Self {
        EscapeRules::new("ur").expect("default autolink prefixes compile")
    }
}

/// Escapes forum markup in the given text.
///
/// Two passes, in order:
///
/// 1. A single left-to-right sweep prefixes every formatting character with a
///    backslash. Running the sweep once means already-inserted escapes are
///    never escaped again.
/// 2. Autolink triggers are neutralized by inserting an escaped slash so the
///    renderer sees a literal slash-letter-slash sequence: `u/name` becomes
///    `u\/name` and `/u/name` becomes `\/u/name`. The name portion keeps the
///    escaping applied in the first pass.
pub fn escape_formatting(text: &str, rules: &EscapeRules) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ESCAPED_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    match &rules.autolink {
        Some(autolink) => autolink
            .replace_all(&escaped, |caps: &Captures<'_>| {
                let prefix = &caps["prefix"];
                let name = &caps["name"];
                if caps.name("lead").is_some() {
                    format!(r"\/{prefix}/{name}")
                } else {
                    format!(r"{prefix}\/{name}")
                }
            })
            .into_owned(),
        None => escaped,
    }
}

/// Lays the given text out as a literal block.
///
/// Every line is prefixed with four spaces so the renderer shows it as
/// preformatted text. Indented blocks are used instead of fenced code blocks
/// because fencing is not supported by every client renderer.
pub fn code_block(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("{BLOCK_INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn escape(text: &str) -> String {
        escape_formatting(text, &EscapeRules::default())
    }

    #[test]
    fn escapes_known_vectors() {
        let cases = [
            (
                "Asd normal text bla bla, this is nice.",
                "Asd normal text bla bla, this is nice.",
            ),
            (
                "Text with **bold** and **more bold**.",
                r"Text with \*\*bold\*\* and \*\*more bold\*\*.",
            ),
            ("> Quoting things", r"\> Quoting things"),
            (
                "Text with *italics* and *more italics*.",
                r"Text with \*italics\* and \*more italics\*.",
            ),
            (
                "Text with _italics_ and _more italics_.",
                r"Text with \_italics\_ and \_more italics\_.",
            ),
            ("#hashtag", r"\#hashtag"),
            (
                "A u/username and other /u/_user123_.",
                r"A u\/username and other \/u/\_user123\_.",
            ),
            (
                "A r/subname and other /r/_sub123_.",
                r"A r\/subname and other \/r/\_sub123\_.",
            ),
        ];

        for (text, expected) in cases {
            assert_eq!(escape(text), expected, "input: {text:?}");
        }
    }

    #[test]
    fn backslash_is_escaped_before_everything_else() {
        assert_eq!(escape(r"a\*b"), r"a\\\*b");
    }

    #[test]
    fn custom_prefix_letters() {
        let rules = EscapeRules::new("c").unwrap();
        assert_eq!(
            escape_formatting("see c/cats and /c/cats", &rules),
            r"see c\/cats and \/c/cats"
        );
        // `u/` is not a reserved prefix under these rules
        assert_eq!(escape_formatting("see u/someone", &rules), "see u/someone");
    }

    #[test]
    fn empty_prefix_set_disables_autolink_handling() {
        let rules = EscapeRules::new("").unwrap();
        assert_eq!(escape_formatting("a u/name", &rules), "a u/name");
    }

    #[test]
    fn code_block_indents_every_line() {
        assert_eq!(code_block("abc\nde\nfghi"), "    abc\n    de\n    fghi");
    }

    #[test]
    fn code_block_of_empty_input_is_a_single_indented_line() {
        assert_eq!(code_block(""), "    ");
    }

    proptest! {
        /// Every formatting character in the output is preceded by a
        /// backslash that the escape pass inserted, so rendering the output
        /// reproduces the input characters.
        #[test]
        fn no_unescaped_formatting_chars(text in "\\PC{0,200}") {
            let escaped = escape(&text);
            let chars: Vec<char> = escaped.chars().collect();
            let mut i = 0;
            while i < chars.len() {
                if chars[i] == '\\' {
                    // An escape sequence: skip the escaped character too.
                    i += 2;
                    continue;
                }
                prop_assert!(
                    !['*', '_', '#', '>'].contains(&chars[i]),
                    "unescaped {:?} at {} in {:?}",
                    chars[i],
                    i,
                    escaped
                );
                i += 1;
            }
        }

        /// The literal block reproduces the input lines exactly once the
        /// indent is stripped.
        #[test]
        fn code_block_roundtrips(text in "[a-z \\n]{0,200}") {
            let block = code_block(&text);
            let stripped: Vec<&str> = block
                .split('\n')
                .map(|line| line.strip_prefix(BLOCK_INDENT).unwrap())
                .collect();
            let original: Vec<&str> = text.split('\n').collect();
            prop_assert_eq!(stripped, original);
        }
    }
}
