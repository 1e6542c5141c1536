use std::collections::HashMap;
use std::sync::Arc;

/// Instruction set a code symbol is encoded in. Only ARM has more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeMode {
    Default,
    Thumb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Demangled name when the raw name is a Rust or C++ mangling.
    pub name: String,
    /// Name as it appears in the symbol table.
    pub raw_name: String,
    pub address: u64,
    pub size: u64,
    /// Index into `Executable::sections`.
    pub section: usize,
    pub mode: CodeMode,
}

impl Symbol {
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.size)
    }
}

/// Demangle Rust (legacy and v0) and Itanium C++ names. Anything else is
/// returned as is.
pub fn demangle(raw: &str) -> String {
    if let Ok(d) = rustc_demangle::try_demangle(raw) {
        // {:#} drops the trailing hash
        return format!("{:#}", d);
    }
    if raw.starts_with("_Z") || raw.starts_with("__Z") {
        let mangled = raw.strip_prefix('_').filter(|s| s.starts_with("_Z")).unwrap_or(raw);
        if let Ok(sym) = cpp_demangle::Symbol::new(mangled) {
            if let Ok(d) = sym.demangle() {
                return d;
            }
        }
    }
    raw.to_string()
}

/// Code symbols in symbol-table order, plus a name index.
#[derive(Debug, Default)]
pub struct SymbolTable {
    ordered: Vec<Arc<Symbol>>,
    symbols_by_name: HashMap<String, Arc<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        let arc_symbol = Arc::new(symbol);
        // First definition wins the name slot; aliases stay in `ordered`.
        self.symbols_by_name
            .entry(arc_symbol.name.clone())
            .or_insert_with(|| arc_symbol.clone());
        self.ordered.push(arc_symbol);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.ordered.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols_by_name.get(name).map(|s| s.as_ref())
    }
}
