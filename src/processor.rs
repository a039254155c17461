use std::io::{self, Read};

use log::{debug, trace, warn};

use crate::ast::{Fragment, Prefix, Token, Variable};
use crate::link::LinkTarget;
use crate::math;
use crate::parser::{VarParser, split_body};
use crate::store::{Lookup, VariableStore};

/// Tuning for the resolution loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Strict passes allowed before the final best-effort pass is forced
    pub max_passes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_passes: 1000 }
    }
}

/// Resolves one page's token queue against the variable store
pub struct Resolver<'a> {
    store: &'a mut VariableStore,
    page: usize,
    max_passes: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a mut VariableStore, page: usize, options: &Options) -> Self {
        Self {
            store,
            page,
            max_passes: options.max_passes,
        }
    }

    /// Substitute until nothing changes, then once more accepting
    /// partially resolved values. Definitions are gone afterwards.
    pub fn resolve(&mut self, tokens: &mut Vec<Token>) {
        for token in tokens.iter_mut() {
            if let Token::Definition(def) = token {
                def.fragments = split_body(&def.content);
            }
        }

        let mut pass = 0;
        loop {
            pass += 1;
            let progress = self.run_pass(tokens, false);
            tokens.retain(|token| !matches!(token, Token::Definition(def) if def.resolved));
            debug!(
                "page {}: pass {} progress={} tokens={}",
                self.page,
                pass,
                progress,
                tokens.len()
            );

            if !progress {
                break;
            }
            if pass >= self.max_passes {
                warn!(
                    "page {}: stopped after {} passes without reaching a fixed point",
                    self.page, pass
                );
                break;
            }
        }

        debug!("page {}: best-effort pass", self.page);
        self.run_pass(tokens, true);
        tokens.retain(|token| !matches!(token, Token::Definition(_)));
    }

    /// One sweep over the queue in source order; true if anything changed.
    ///
    /// The best-effort sweep only touches calls, and lets them use
    /// unresolved values.
    fn run_pass(&mut self, tokens: &mut [Token], best_effort: bool) -> bool {
        let mut progress = false;
        for token in tokens.iter_mut() {
            let value = match token {
                Token::Text(_) => None,
                Token::Definition(def) => {
                    if !best_effort && !def.resolved {
                        progress |= self.resolve_definition(def);
                    }
                    None
                }
                Token::Call(call) => {
                    self.replace_var(call.prefix, &call.name, Lookup::Hoisted, best_effort)
                }
            };
            if let Some(value) = value {
                trace!("page {}: call resolved to {:?}", self.page, value);
                *token = Token::Text(value);
                progress = true;
            }
        }
        progress
    }

    /// Substitute nested calls in a definition body and store the result,
    /// resolved or not. Returns true if a call was substituted or the body
    /// is now resolved.
    fn resolve_definition(&mut self, def: &mut Variable) -> bool {
        let mut changed = false;
        for fragment in def.fragments.iter_mut() {
            let Fragment::Call { prefix, name, .. } = &*fragment else {
                continue;
            };
            if let Some(value) = self.replace_var(*prefix, name, Lookup::Backward, false) {
                *fragment = Fragment::Text(value);
                changed = true;
            }
        }

        let resolved = def
            .fragments
            .iter()
            .all(|fragment| matches!(fragment, Fragment::Text(_)));
        def.content = def.fragments.iter().map(Fragment::as_str).collect();
        def.resolved = resolved;
        self.store
            .store(self.page, &def.name, def.content.clone(), resolved);
        trace!(
            "page {}: definition `{}` resolved={}",
            self.page, def.name, resolved
        );
        changed || resolved
    }

    /// Compute what a call to `name` renders as, if it can be resolved now.
    fn replace_var(
        &self,
        prefix: Prefix,
        name: &str,
        lookup: Lookup,
        allow_unresolved: bool,
    ) -> Option<String> {
        let operands = math_operands(name);
        if prefix == Prefix::Raw && operands.first().copied() != Some(name.trim()) {
            return self.evaluate_math(name, &operands);
        }

        let record = self.store.lookup(name, self.page, lookup)?;
        if !record.resolved && !allow_unresolved {
            return None;
        }
        match prefix {
            Prefix::Raw => Some(record.content.clone()),
            Prefix::Link | Prefix::Image => {
                LinkTarget::parse(&record.content)?.render(prefix, name)
            }
        }
    }

    /// Substitute numeric variables into `expr` and evaluate it
    fn evaluate_math(&self, expr: &str, operands: &[&str]) -> Option<String> {
        let mut expr = expr.to_string();
        for operand in operands {
            let Some(record) = self.store.lookup(operand, self.page, Lookup::Backward) else {
                continue;
            };
            if record.resolved && !record.content.is_empty() && is_numeric(&record.content) {
                expr = replace_word(&expr, operand, &record.content);
            }
        }

        match math::evaluate(&expr) {
            Ok(value) => Some(value.to_string()),
            Err(err) => {
                debug!("page {}: `{}` did not evaluate: {}", self.page, expr, err);
                None
            }
        }
    }
}

/// Non-numeric pieces left after cutting `label` at operators and
/// lowercase function heads such as `round(`.
fn math_operands(label: &str) -> Vec<&str> {
    let bytes = label.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let letters = bytes[i..]
            .iter()
            .take_while(|b| b.is_ascii_lowercase())
            .count();
        let cut = if letters > 0 && bytes.get(i + letters) == Some(&b'(') {
            letters + 1
        } else if b"+-*/^(),".contains(&bytes[i]) {
            1
        } else {
            0
        };

        if cut > 0 {
            pieces.push(&label[start..i]);
            i += cut;
            start = i;
        } else {
            i += 1;
        }
    }
    pieces.push(&label[start..]);

    pieces
        .into_iter()
        .filter(|piece| !is_numeric(piece))
        .map(str::trim)
        .collect()
}

/// Whether `text` reads as a number; blank text counts as zero.
fn is_numeric(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned == "Infinity"
        || (unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
            && text.parse::<f64>().is_ok())
}

/// Replace occurrences of `word` not touching other word characters.
fn replace_word(text: &str, word: &str, with: &str) -> String {
    if word.is_empty() {
        return text.to_string();
    }
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut search = 0;
    while let Some(found) = text[search..].find(word) {
        let at = search + found;
        let end = at + word.len();
        if is_word(text[..at].chars().next_back()) || is_word(text[end..].chars().next()) {
            search = at + text[at..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        out.push_str(&text[last..at]);
        out.push_str(with);
        last = end;
        search = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Document-wide variable state, threaded through every page render.
///
/// Pages must be preprocessed in ascending order for backward lookups to
/// see earlier pages. Values defined on later pages only become visible
/// after the whole document has been rendered once.
#[derive(Debug, Default)]
pub struct VarContext {
    store: VariableStore,
    page: usize,
    queue: Vec<Token>,
    options: Options,
}

impl VarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Select the page that `preprocess` and lookups run against
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Resolve variables in one page of source text (main entry point)
    pub fn preprocess(&mut self, source: &str) -> String {
        self.store.clear_page(self.page);
        self.queue = VarParser::parse_input(source);
        debug!("page {}: {} tokens", self.page, self.queue.len());

        Resolver::new(&mut self.store, self.page, &self.options).resolve(&mut self.queue);
        self.queue.iter().map(Token::output).collect()
    }

    /// Inject a resolved value from outside the document
    pub fn set_variable(&mut self, name: &str, content: impl Into<String>, page: usize) {
        self.store.set_external(page, name, content);
    }

    /// Read a resolved value as seen from `page`, hoisting if needed
    pub fn get_variable(&self, name: &str, page: usize) -> Option<&str> {
        self.store
            .lookup(name, page, Lookup::Hoisted)
            .filter(|record| record.resolved)
            .map(|record| record.content.as_str())
    }

    /// Forget the token queue and every value on the current page
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.store.remove_page(self.page);
    }
}

/// A reader that resolves variables in one page read from `inner`
pub struct PreprocessingReader<'c, R: Read> {
    inner: R,
    context: &'c mut VarContext,
    buffer: Vec<u8>,
    buffer_pos: usize,
    done: bool,
}

impl<'c, R: Read> PreprocessingReader<'c, R> {
    pub fn new(inner: R, context: &'c mut VarContext) -> Self {
        Self {
            inner,
            context,
            buffer: Vec::new(),
            buffer_pos: 0,
            done: false,
        }
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        if self.done {
            return Ok(());
        }

        // A page has to be resolved as a whole
        let mut input = String::new();
        self.inner.read_to_string(&mut input)?;

        self.buffer = self.context.preprocess(&input).into_bytes();
        self.buffer_pos = 0;
        self.done = true;
        Ok(())
    }
}

impl<R: Read> Read for PreprocessingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer_pos >= self.buffer.len() && !self.done {
            self.fill_buffer()?;
        }

        if self.buffer_pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = self.buffer.len() - self.buffer_pos;
        let to_copy = std::cmp::min(available, buf.len());
        buf[..to_copy].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + to_copy]);
        self.buffer_pos += to_copy;

        Ok(to_copy)
    }
}
