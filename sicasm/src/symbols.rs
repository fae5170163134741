//! Per-control-section symbol table.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// A label on a statement.
    Label,
    /// Defined by `EQU`.
    Equate,
    /// Declared by `EXTREF`; its value stays 0 and every use becomes a
    /// modification-record fixup.
    External,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    /// Before layout: the offset within `block`. After layout: the final
    /// address within the section. Absolute equates hold their value
    /// directly the whole time.
    pub value: u32,
    pub kind: SymbolKind,
    pub relocatable: bool,
    pub block: Option<usize>,
    /// Index of the defining line in the expanded stream; orders
    /// definitions for the automatic-BASE candidate search.
    pub defined_at: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Insert a symbol; returns false (and leaves the table unchanged)
    /// when the name is already present in this section.
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_owned(), symbol);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(name, sym)| (name.as_str(), sym))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebase block-relative symbols onto the final block bases.
    pub fn finalize(&mut self, bases: &[u32]) {
        for symbol in self.entries.values_mut() {
            if let Some(block) = symbol.block {
                symbol.value += bases[block];
            }
        }
    }
}
