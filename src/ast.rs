/// Marker written in front of a variable label: `[x]`, `![x]` or `$[x]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    /// `[name]`: renders as a link when the value looks like a link target
    #[default]
    Link,
    /// `![name]`: renders as an image
    Image,
    /// `$[name]`: substitutes the raw value, or evaluates math
    Raw,
}

impl Prefix {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'!' => Some(Prefix::Image),
            b'$' => Some(Prefix::Raw),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Prefix::Link => "",
            Prefix::Image => "!",
            Prefix::Raw => "$",
        }
    }
}

/// A named definition or call site found in page text
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub prefix: Prefix,
    /// Normalized name
    pub name: String,
    /// Definition body, or for calls the text emitted while unresolved
    pub content: String,
    /// Set on definitions once every nested call has been substituted
    pub resolved: bool,
    /// Definition body split around its nested calls while resolving
    pub fragments: Vec<Fragment>,
}

impl Variable {
    pub fn definition(prefix: Prefix, name: String, content: String) -> Self {
        Self {
            prefix,
            name,
            content,
            resolved: false,
            fragments: Vec::new(),
        }
    }

    /// A call whose fallback content is its own literal source form.
    pub fn call(prefix: Prefix, name: String) -> Self {
        let content = format!("{}[{}]", prefix.as_str(), name);
        Self {
            prefix,
            name,
            content,
            resolved: false,
            fragments: Vec::new(),
        }
    }
}

/// Piece of a definition body. Substituted values become `Text` and are
/// never scanned again.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    Call {
        prefix: Prefix,
        /// Normalized name
        name: String,
        /// Source form, kept while the call is unresolved
        literal: String,
    },
}

impl Fragment {
    pub fn as_str(&self) -> &str {
        match self {
            Fragment::Text(text) => text,
            Fragment::Call { literal, .. } => literal,
        }
    }
}

/// One element of a page's token queue
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Passthrough text, never rescanned
    Text(String),
    /// `[name]: body` or `[name](body)`
    Definition(Variable),
    /// `[name]`, `![name]` or `$[name]`
    Call(Variable),
}

impl Token {
    /// Text this token contributes to the rendered page.
    /// Definitions render as nothing.
    pub fn output(&self) -> &str {
        match self {
            Token::Text(text) => text,
            Token::Call(call) => &call.content,
            Token::Definition(_) => "",
        }
    }
}

/// Stored value of a variable on one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRecord {
    pub content: String,
    /// False while some nested reference is still unsubstituted
    pub resolved: bool,
    /// Injected by the host rather than defined in the page
    pub external: bool,
}
