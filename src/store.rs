use std::collections::{BTreeMap, HashMap};

use crate::ast::VarRecord;

/// Trim a name and squeeze internal whitespace runs to one space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How far a lookup may search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The given page, then each earlier page
    Backward,
    /// Backward first, then every known page from the highest down
    Hoisted,
}

/// Variable records for every page seen so far, keyed by page index
#[derive(Debug, Default, Clone)]
pub struct VariableStore(BTreeMap<usize, HashMap<String, VarRecord>>);

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the record visible from `page`.
    ///
    /// Returns the first hit whether or not it is resolved.
    pub fn lookup(&self, name: &str, page: usize, mode: Lookup) -> Option<&VarRecord> {
        let name = normalize_name(name);
        let backward = self
            .0
            .range(..=page)
            .rev()
            .find_map(|(_, vars)| vars.get(&name));
        match mode {
            Lookup::Backward => backward,
            Lookup::Hoisted => {
                backward.or_else(|| self.0.values().rev().find_map(|vars| vars.get(&name)))
            }
        }
    }

    /// Store a fully resolved in-document value, replacing any previous one.
    pub fn set(&mut self, page: usize, name: &str, content: impl Into<String>) {
        self.store(page, name, content, true);
    }

    /// Store a value that may still contain unsubstituted references.
    pub fn store(&mut self, page: usize, name: &str, content: impl Into<String>, resolved: bool) {
        self.insert(
            page,
            name,
            VarRecord {
                content: content.into(),
                resolved,
                external: false,
            },
        );
    }

    /// Store a host-provided value that survives the next page clear.
    pub fn set_external(&mut self, page: usize, name: &str, content: impl Into<String>) {
        self.insert(
            page,
            name,
            VarRecord {
                content: content.into(),
                resolved: true,
                external: true,
            },
        );
    }

    /// Drop the page's in-document records before it is tokenized again.
    ///
    /// External records are kept, but lose their external mark.
    pub fn clear_page(&mut self, page: usize) {
        let vars = self.0.entry(page).or_default();
        vars.retain(|_, record| record.external);
        for record in vars.values_mut() {
            record.external = false;
        }
    }

    /// Drop every record on the page, external ones included.
    pub fn remove_page(&mut self, page: usize) {
        self.0.remove(&page);
    }

    pub fn highest_page(&self) -> Option<usize> {
        self.0.keys().next_back().copied()
    }

    /// Records stored on exactly this page
    pub fn page(&self, page: usize) -> Option<&HashMap<String, VarRecord>> {
        self.0.get(&page)
    }

    fn insert(&mut self, page: usize, name: &str, record: VarRecord) {
        self.0
            .entry(page)
            .or_default()
            .insert(normalize_name(name), record);
    }
}
