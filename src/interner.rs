use std::cell::RefCell;

use string_interner::backend::StringBackend;
use string_interner::symbol::SymbolU32;
use string_interner::StringInterner;

pub type Symbol = SymbolU32;

/// Session-wide string interner. Identifier and string lexemes are interned
/// once at scan time; everything downstream deals in `Symbol`s and only
/// resolves back to text for diagnostics and `print`.
pub struct Interner {
    pub sym_this: Symbol,
    pub sym_init: Symbol,
    pub sym_super: Symbol,
    inner: RefCell<StringInterner<StringBackend<Symbol>>>,
}

impl Interner {
    pub fn new() -> Interner {
        let mut inner = StringInterner::<StringBackend<Symbol>>::new();
        Interner {
            sym_this: inner.get_or_intern("this"),
            sym_init: inner.get_or_intern("init"),
            sym_super: inner.get_or_intern("super"),
            inner: RefCell::new(inner),
        }
    }

    pub fn intern<T>(&self, string: T) -> Symbol
    where
        T: AsRef<str>,
    {
        self.inner.borrow_mut().get_or_intern(string)
    }

    pub fn resolve(&self, symbol: Symbol) -> String {
        String::from(
            self.inner
                .borrow()
                .resolve(symbol)
                .expect("symbol from a foreign interner"),
        )
    }
}

impl Default for Interner {
    fn default() -> Interner {
        Interner::new()
    }
}
