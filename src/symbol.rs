use std::collections::HashMap;

/// Unique identifier for an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Interned symbol table. Each unique symbol name maps to a unique SymbolId,
/// so `(eq? 'foo 'foo)` is true because both resolve to the same id.
pub struct SymbolTable {
    name_to_id: HashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use super::SymbolId;

    // Special-form keywords, recognised by identity at the head of a pair.
    pub const QUOTE: SymbolId = SymbolId(0);
    pub const IF: SymbolId = SymbolId(1);
    pub const BEGIN: SymbolId = SymbolId(2);
    pub const LAMBDA: SymbolId = SymbolId(3);
    pub const DEFINE: SymbolId = SymbolId(4);
    pub const SET_BANG: SymbolId = SymbolId(5);
    // Reserved names, bound to themselves and unwrapped at application time.
    pub const APPLY: SymbolId = SymbolId(6);
    pub const CALLCC: SymbolId = SymbolId(7);
    // Intrinsic names.
    pub const CAR: SymbolId = SymbolId(8);
    pub const CDR: SymbolId = SymbolId(9);
    pub const CONS: SymbolId = SymbolId(10);
    pub const EQ_P: SymbolId = SymbolId(11);
    pub const EQV_P: SymbolId = SymbolId(12);
    pub const PAIR_P: SymbolId = SymbolId(13);
    pub const NULL_P: SymbolId = SymbolId(14);
    pub const NOT: SymbolId = SymbolId(15);
    pub const SYMBOL_P: SymbolId = SymbolId(16);
    pub const EOF_OBJECT_P: SymbolId = SymbolId(17);
    pub const LIST: SymbolId = SymbolId(18);
    pub const DISPLAY: SymbolId = SymbolId(19);
    pub const NEWLINE: SymbolId = SymbolId(20);
    pub const READ: SymbolId = SymbolId(21);
    pub const PLUS: SymbolId = SymbolId(22);
    pub const MINUS: SymbolId = SymbolId(23);
    pub const TIMES: SymbolId = SymbolId(24);
    pub const LESS: SymbolId = SymbolId(25);
    pub const NUM_EQ: SymbolId = SymbolId(26);
    pub const NUMBER_P: SymbolId = SymbolId(27);
    pub const ERROR: SymbolId = SymbolId(28);
    pub const GLOBALS: SymbolId = SymbolId(29);
}

impl SymbolTable {
    /// Create a new symbol table with all well-known symbols pre-interned.
    /// The order MUST match the constants in the `sym` module above.
    pub fn new() -> Self {
        let names = [
            "quote", "if", "begin", "lambda", "define", "set!",
            "apply", "call/cc",
            "car", "cdr", "cons", "eq?", "eqv?", "pair?", "null?", "not",
            "symbol?", "eof-object?", "list", "display", "newline", "read",
            "+", "-", "*", "<", "=", "number?", "error", "globals",
        ];

        let mut table = SymbolTable {
            name_to_id: HashMap::new(),
            id_to_name: Vec::new(),
        };
        for name in names {
            table.intern(name);
        }
        table
    }

    /// Intern a symbol name. Returns the existing ID if already interned,
    /// or creates a new one.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Look up a symbol name by its ID.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol ID by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut t = SymbolTable::new();
        let a = t.intern("hello");
        let b = t.intern("hello");
        let c = t.intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(t.name(a), "hello");
        assert_eq!(t.name(c), "world");
    }

    #[test]
    fn keywords_are_preinterned() {
        let mut t = SymbolTable::new();
        assert_eq!(t.intern("quote"), sym::QUOTE);
        assert_eq!(t.intern("lambda"), sym::LAMBDA);
        assert_eq!(t.intern("set!"), sym::SET_BANG);
        assert_eq!(t.intern("call/cc"), sym::CALLCC);
        assert_eq!(t.intern("eof-object?"), sym::EOF_OBJECT_P);
        assert_eq!(t.intern("globals"), sym::GLOBALS);
    }

    #[test]
    fn equal_names_share_an_id_distinct_names_never_do() {
        let mut t = SymbolTable::new();
        let names = ["x", "y", "x2", "set!", "x", "y"];
        let ids: Vec<_> = names.iter().map(|n| t.intern(n)).collect();
        for (i, a) in names.iter().enumerate() {
            for (j, b) in names.iter().enumerate() {
                assert_eq!(a == b, ids[i] == ids[j]);
            }
        }
    }
}
