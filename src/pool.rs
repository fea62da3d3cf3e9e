//! Per-document string/name interning.
//!
//! Names and literal strings are short, heavily repeated byte sequences (resource names like
//! `/F1`, dictionary keys like `/Type`). Rather than reproduce the C original's bare-pointer
//! arena (unsafe in Rust and unnecessary — `Rc<[u8]>` gives the same sharing with safe,
//! refcounted lifetime tracking), each `Document` owns a dedup cache keyed by byte content.
//! `Object::Name`/`Object::String` still store plain `Vec<u8>` for API simplicity; callers that
//! want pool sharing (e.g. resource dictionaries built by `creator`) go through
//! [`StringPool::intern`] explicitly.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct StringPool {
    entries: RefCell<HashSet<Rc<[u8]>>>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared handle for `bytes`, reusing an existing entry if one is already pooled.
    pub fn intern(&self, bytes: &[u8]) -> Rc<[u8]> {
        if let Some(existing) = self.entries.borrow().get(bytes) {
            return Rc::clone(existing);
        }
        let handle: Rc<[u8]> = Rc::from(bytes);
        self.entries.borrow_mut().insert(Rc::clone(&handle));
        handle
    }

    /// Whether `handle` was produced by this pool (a pointer-identity test on the pooled copy,
    /// used to decide whether a value can be shared as-is when copying object graphs across
    /// documents, or must be re-interned into the destination document's pool).
    pub fn owns(&self, handle: &Rc<[u8]>) -> bool {
        self.entries
            .borrow()
            .get(handle.as_ref())
            .map(|pooled| Rc::ptr_eq(pooled, handle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

// `HashSet<Rc<[u8]>>` needs `Borrow<[u8]>` to look entries up by `&[u8]`; `Rc<[u8]>` already
// implements that via its `Deref`, so no custom `Borrow` impl is required here.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups_identical_bytes() {
        let pool = StringPool::new();
        let a = pool.intern(b"Type");
        let b = pool.intern(b"Type");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn owns_detects_foreign_handles() {
        let pool_a = StringPool::new();
        let pool_b = StringPool::new();
        let handle_a = pool_a.intern(b"Root");
        let handle_b = pool_b.intern(b"Root");
        assert!(pool_a.owns(&handle_a));
        assert!(!pool_a.owns(&handle_b));
    }
}
