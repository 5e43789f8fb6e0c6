use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::InterpreterError;

/// Stable index of an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringHandle(usize);

impl StringHandle {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StringHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only, de-duplicating string table.
///
/// Handles are dense indices in insertion order; the hash map only speeds up
/// the duplicate search.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    table: Vec<Arc<str>>,
    mappings: HashMap<Arc<str>, StringHandle>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle for `text`, or appends it.
    pub fn intern(&mut self, text: &str) -> StringHandle {
        if let Some(&handle) = self.mappings.get(text) {
            return handle;
        }
        let handle = StringHandle(self.table.len());
        let interned = Arc::<str>::from(text);
        self.table.push(Arc::clone(&interned));
        self.mappings.insert(interned, handle);
        handle
    }

    pub fn resolve(&self, handle: StringHandle) -> Result<&str, InterpreterError> {
        self.get(handle).ok_or(InterpreterError::InvalidStringHandle {
            handle: handle.index(),
        })
    }

    pub fn get(&self, handle: StringHandle) -> Option<&str> {
        self.table.get(handle.0).map(|text| &**text)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringHandle, &str)> {
        self.table
            .iter()
            .enumerate()
            .map(|(index, text)| (StringHandle(index), &**text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut strings = StringTable::new();
        let a = strings.intern("abc");
        let b = strings.intern("abc");
        assert_eq!(a, b);
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn resolve_round_trips() {
        let mut strings = StringTable::new();
        for text in ["", "hi", "héllo", "abc"] {
            let handle = strings.intern(text);
            assert_eq!(strings.resolve(handle), Ok(text));
        }
    }

    #[test]
    fn handles_are_dense_and_ordered() {
        let mut strings = StringTable::new();
        let first = strings.intern("first");
        let second = strings.intern("second");
        strings.intern("first");
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(
            strings.iter().collect::<Vec<_>>(),
            vec![(first, "first"), (second, "second")]
        );
    }

    #[test]
    fn equality_is_exact() {
        let mut strings = StringTable::new();
        assert_ne!(strings.intern("abc"), strings.intern("ABC"));
        assert_ne!(strings.intern("abc"), strings.intern("abc "));
    }

    #[test]
    fn unknown_handle() {
        let strings = StringTable::new();
        assert_eq!(
            strings.resolve(StringHandle(5)),
            Err(InterpreterError::InvalidStringHandle { handle: 5 })
        );
    }
}
