use std::sync::LazyLock;

use regex::Regex;

use crate::ast::Prefix;

/// A bare or `<bracketed>` destination, optionally followed by a title
/// in double quotes, single quotes or parentheses, alone on a line.
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^([^<\s][^\s]*|<.*?>)(?: ("(?:\\"|[^"])*"|'(?:\\'|[^'])*'|\((?:\\\(|\\\)|[^()])*\)))?$"#,
    )
    .expect("link target pattern is valid")
});

/// Destination and title read from a variable's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub href: String,
    pub title: Option<String>,
}

impl LinkTarget {
    /// Match the first line of `content` shaped like a link destination.
    pub fn parse(content: &str) -> Option<Self> {
        let caps = LINK_TARGET.captures(content)?;
        let href = caps.get(1)?.as_str().to_string();
        let title = caps
            .get(2)
            .map(|m| {
                let quoted = m.as_str();
                quoted[1..quoted.len() - 1].to_string()
            })
            .filter(|title| !title.is_empty());
        Some(Self { href, title })
    }

    /// Markdown for a link or image labelled `label`.
    ///
    /// `$` calls never render as links.
    pub fn render(&self, prefix: Prefix, label: &str) -> Option<String> {
        let bang = match prefix {
            Prefix::Link => "",
            Prefix::Image => "!",
            Prefix::Raw => return None,
        };
        Some(match &self.title {
            Some(title) => format!("{bang}[{label}]({} \"{title}\")", self.href),
            None => format!("{bang}[{label}]({})", self.href),
        })
    }
}
