use log::trace;

use crate::ast::{Fragment, Prefix, Token, Variable};
use crate::store::normalize_name;

/// A `prefix[label]` occurrence inside some text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label<'a> {
    pub prefix: Prefix,
    /// Raw text between the brackets
    pub name: &'a str,
    /// Offset of the prefix, or of `[` when there is none
    pub start: usize,
    /// Offset just past the closing `]`
    pub end: usize,
}

/// Try to read a label starting exactly at `pos`.
///
/// The name may not be blank, may not contain an unescaped `[` or `]`,
/// and a backslash escapes any character except a line break.
pub fn scan_label(src: &str, pos: usize) -> Option<Label<'_>> {
    let bytes = src.as_bytes();
    let (prefix, open) = match *bytes.get(pos)? {
        b'[' => (Prefix::Link, pos),
        b => (Prefix::from_byte(b)?, pos + 1),
    };
    if bytes.get(open) != Some(&b'[') {
        return None;
    }

    let body = open + 1;
    if src[body..].trim_start().starts_with(']') {
        return None;
    }

    let mut i = body;
    while i < bytes.len() {
        match bytes[i] {
            b']' => {
                return Some(Label {
                    prefix,
                    name: &src[body..i],
                    start: pos,
                    end: i + 1,
                });
            }
            b'[' => return None,
            b'\\' => {
                let escaped = src[i + 1..].chars().next()?;
                if matches!(escaped, '\n' | '\r') {
                    return None;
                }
                i += 1 + escaped.len_utf8();
            }
            _ => i += 1,
        }
    }
    None
}

/// Every non-overlapping label in `src`, left to right.
pub fn find_labels(src: &str) -> Vec<Label<'_>> {
    let mut labels = Vec::new();
    let mut pos = 0;
    while pos < src.len() {
        match scan_label(src, pos) {
            Some(label) => {
                pos = label.end;
                labels.push(label);
            }
            None => pos += 1,
        }
    }
    labels
}

/// Split a definition body into text and the nested calls it contains.
pub fn split_body(body: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut last = 0;
    for label in find_labels(body) {
        if label.start > last {
            fragments.push(Fragment::Text(body[last..label.start].to_string()));
        }
        fragments.push(Fragment::Call {
            prefix: label.prefix,
            name: normalize_name(label.name),
            literal: body[label.start..label.end].to_string(),
        });
        last = label.end;
    }
    if last < body.len() {
        fragments.push(Fragment::Text(body[last..].to_string()));
    }
    fragments
}

/// Tokenizer for variable syntax in page source
pub struct VarParser;

impl VarParser {
    /// Split page source into text, definitions and calls.
    ///
    /// Never fails: anything that does not form valid variable syntax is
    /// kept as text, and code regions are copied without being scanned.
    pub fn parse_input(input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(input);
        let mut state = State::InText;
        loop {
            state = match state {
                State::InText => scanner.scan_text(),
                State::InCodeBlock { end } => {
                    scanner.pos = end;
                    State::InText
                }
                State::InCallPrefix => scanner.scan_call(),
                State::InDefinition { label, end } => scanner.emit_block_definition(label, end),
                State::InParenCapture { label, close } => {
                    scanner.emit_inline_definition(label, close)
                }
                State::Done => break,
            };
        }
        scanner.finish()
    }
}

enum State<'a> {
    InText,
    /// Code region running up to `end`
    InCodeBlock {
        end: usize,
    },
    /// At a `[`, `![` or `$[` candidate
    InCallPrefix,
    /// `[name]:` at line start with a body ending at `end`
    InDefinition {
        label: Label<'a>,
        end: usize,
    },
    /// `[name](` with the body closed by the `)` at `close`
    InParenCapture {
        label: Label<'a>,
        close: usize,
    },
    Done,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Start of text not yet emitted as a token
    text_start: usize,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            text_start: 0,
            tokens: Vec::new(),
        }
    }

    fn scan_text(&mut self) -> State<'a> {
        while self.pos < self.bytes.len() {
            if let Some(end) = self.code_region_end(self.pos) {
                return State::InCodeBlock { end };
            }
            if matches!(self.bytes[self.pos], b'[' | b'!' | b'$') {
                return State::InCallPrefix;
            }
            self.pos += 1;
        }
        State::Done
    }

    fn scan_call(&mut self) -> State<'a> {
        let Some(label) = scan_label(self.src, self.pos) else {
            self.pos += 1;
            return State::InText;
        };

        let after = label.end;
        match self.bytes.get(after) {
            Some(b':') if self.at_line_start(label.start) => {
                if let Some(end) = self.block_body_end(after) {
                    return State::InDefinition { label, end };
                }
            }
            Some(b'(') => {
                return match self.paren_close(after) {
                    Some(close) => State::InParenCapture { label, close },
                    None => {
                        self.pos += 1;
                        State::InText
                    }
                };
            }
            _ => {}
        }

        let call = Variable::call(label.prefix, normalize_name(label.name));
        trace!("call `{}`", call.name);
        self.push(label.start, Token::Call(call));
        self.advance_to(after);
        State::InText
    }

    fn emit_block_definition(&mut self, label: Label<'a>, end: usize) -> State<'a> {
        let body = collapse_blanks(&self.src[label.end + 1..end]);
        let name = normalize_name(label.name);
        trace!("block definition `{}`", name);
        self.push(
            label.start,
            Token::Definition(Variable::definition(label.prefix, name, body)),
        );
        self.advance_to(end);
        State::InText
    }

    fn emit_inline_definition(&mut self, label: Label<'a>, close: usize) -> State<'a> {
        let body = normalize_name(&self.src[label.end + 1..close]);
        let name = normalize_name(label.name);
        trace!("inline definition `{}`", name);
        self.push(
            label.start,
            Token::Definition(Variable::definition(label.prefix, name.clone(), body)),
        );
        self.tokens.push(Token::Call(Variable::call(label.prefix, name)));
        self.advance_to(close + 1);
        State::InText
    }

    fn finish(mut self) -> Vec<Token> {
        if self.text_start < self.bytes.len() {
            self.tokens
                .push(Token::Text(self.src[self.text_start..].to_string()));
        }
        self.tokens
    }

    /// Flush pending text up to `start`, then push `token`
    fn push(&mut self, start: usize, token: Token) {
        if start > self.text_start {
            self.tokens
                .push(Token::Text(self.src[self.text_start..start].to_string()));
        }
        self.tokens.push(token);
    }

    fn advance_to(&mut self, pos: usize) {
        self.pos = pos;
        self.text_start = pos;
    }

    fn at_line_start(&self, pos: usize) -> bool {
        pos == 0 || self.bytes[pos - 1] == b'\n'
    }

    /// Offset of the next `\n` at or after `from`, or the input length
    fn next_newline(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |i| from + i)
    }

    fn code_region_end(&self, pos: usize) -> Option<usize> {
        if self.at_line_start(pos) {
            if let Some(end) = self.indented_code_end(pos).or_else(|| self.fenced_code_end(pos)) {
                return Some(end);
            }
        }
        if self.bytes[pos] == b'`' {
            return self.bytes[pos + 1..]
                .iter()
                .position(|&b| b == b'`')
                .map(|i| pos + i + 2);
        }
        None
    }

    /// Lines indented by four spaces, plus the space-only lines between them
    fn indented_code_end(&self, pos: usize) -> Option<usize> {
        let len = self.bytes.len();
        let mut end = None;
        let mut i = pos;
        while self.bytes[i..].starts_with(b"    ") && i + 4 < len && self.bytes[i + 4] != b'\n' {
            i = self.next_newline(i + 4);
            end = Some(i);
            if i == len {
                break;
            }
            i += 1;
            loop {
                let mut j = i;
                while self.bytes.get(j) == Some(&b' ') {
                    j += 1;
                }
                match self.bytes.get(j) {
                    Some(b'\n') => i = j + 1,
                    None => {
                        i = j;
                        break;
                    }
                    Some(_) => break,
                }
            }
            end = Some(i);
        }
        end
    }

    /// A ``` or ~~~ fence through its matching closing fence
    fn fenced_code_end(&self, pos: usize) -> Option<usize> {
        let mut i = pos;
        while i < pos + 3 && self.bytes.get(i) == Some(&b' ') {
            i += 1;
        }
        let fence_char = *self.bytes.get(i)?;
        if fence_char != b'`' && fence_char != b'~' {
            return None;
        }
        let fence_start = i;
        while self.bytes.get(i) == Some(&fence_char) {
            i += 1;
        }
        let fence = &self.bytes[fence_start..i];
        if fence.len() < 3 {
            return None;
        }

        let info_end = self.next_newline(i);
        if fence_char == b'`' && self.bytes[i..info_end].contains(&b'`') {
            return None;
        }
        if info_end == self.bytes.len() {
            return None;
        }

        let mut line = info_end + 1;
        loop {
            if let Some(end) = self.closing_fence_end(line, fence) {
                return Some(end);
            }
            let next = self.next_newline(line);
            if next == self.bytes.len() {
                return None;
            }
            line = next + 1;
        }
    }

    fn closing_fence_end(&self, line: usize, fence: &[u8]) -> Option<usize> {
        let mut j = line;
        while j < line + 3 && self.bytes.get(j) == Some(&b' ') {
            j += 1;
        }
        if !self.bytes[j..].starts_with(fence) {
            return None;
        }
        j += fence.len();
        while matches!(self.bytes.get(j), Some(b'`') | Some(b'~')) {
            j += 1;
        }
        while self.bytes.get(j) == Some(&b' ') {
            j += 1;
        }
        matches!(self.bytes.get(j), None | Some(b'\n') | Some(b'\r')).then_some(j)
    }

    /// End of a block definition body whose `:` sits at `colon`.
    ///
    /// The body is one or more line fragments; each may begin on the next
    /// line and must reach a non-whitespace character after leading spaces.
    /// A fragment runs to `\n`, so a trailing `\r` stays in it.
    fn block_body_end(&self, colon: usize) -> Option<usize> {
        let mut end = None;
        let mut i = colon + 1;
        loop {
            let mut j = i;
            if self.bytes.get(j) == Some(&b'\n') {
                j += 1;
            }
            while self.bytes.get(j) == Some(&b' ') {
                j += 1;
            }
            match self.src[j..].chars().next() {
                Some(c) if !c.is_whitespace() => {
                    j = self.next_newline(j);
                    end = Some(j);
                    i = j;
                }
                _ => return end,
            }
        }
    }

    /// The `)` closing an inline definition body opened at `open`.
    ///
    /// The candidate body runs to the last `)` on the line; it is cut short
    /// at the first `)` that closes more parens than were opened.
    fn paren_close(&self, open: usize) -> Option<usize> {
        let line_end = self.next_newline(open + 1);
        let last = open + 1 + self.bytes[open + 1..line_end].iter().rposition(|&b| b == b')')?;
        if last == open + 1 {
            return None;
        }

        let mut depth = 0i32;
        let mut i = open + 1;
        while i < last {
            match self.bytes[i] {
                b'\\' => i += 1,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Some(last)
    }
}

/// Trim, and squeeze runs of spaces and tabs while keeping line breaks
fn collapse_blanks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.trim().chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
