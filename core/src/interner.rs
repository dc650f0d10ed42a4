use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// An interned symbol name.
///
/// Two symbols are equal exactly when their names are equal, so comparing
/// symbols never touches the string data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    /// Intern a name and return its symbol
    pub fn new(name: &str) -> Self {
        {
            let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(sym) = interner.get(name) {
                return Symbol(sym);
            }
        }
        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
        Symbol(interner.get_or_intern(name))
    }

    /// Resolve the symbol back to an owned name
    pub fn name(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Run a function against the interned name without allocating
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        f(interner.resolve(self.0).unwrap_or_default())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "Symbol({s})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_is_same_symbol() {
        assert_eq!(Symbol::new("foo"), Symbol::new("foo"));
    }

    #[test]
    fn test_different_names_differ() {
        assert_ne!(Symbol::new("foo"), Symbol::new("bar"));
    }

    #[test]
    fn test_name_round_trips() {
        assert_eq!(Symbol::new("let*").name(), "let*");
    }

    #[test]
    fn test_with_str() {
        let len = Symbol::new("swap!").with_str(|s| s.len());
        assert_eq!(len, 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Symbol::new("display-test")), "display-test");
    }
}
