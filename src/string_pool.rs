//! Interning of every string stored in a package.
//!
//! Strings are copied into an arena that is never shrunk, so a
//! reference handed out by the pool stays valid for as long as the
//! pool itself.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use typed_arena::Arena;

/// A string that lives inside a `StringPool`.
///
/// Only the pool that produced it may turn it back into a `&str`.
#[derive(Copy, Clone)]
pub struct InternedString(*const str);

impl InternedString {
    fn from_str(s: &str) -> InternedString {
        InternedString(s as *const str)
    }

    fn as_str(&self) -> &str {
        // The arena never moves or frees a string once allocated.
        unsafe { &*self.0 }
    }
}

// The pointee is owned by the pool's arena, which moves between
// threads together with every structure holding these pointers.
unsafe impl Send for InternedString {}

impl Borrow<str> for InternedString {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for InternedString {
    fn eq(&self, other: &InternedString) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for InternedString {}

impl Hash for InternedString {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.as_str().hash(state)
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

pub struct StringPool {
    index: RefCell<HashSet<InternedString>>,
    arena: Arena<u8>,
}

impl Default for StringPool {
    fn default() -> Self {
        StringPool::new()
    }
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool {
            index: RefCell::new(HashSet::new()),
            arena: Arena::new(),
        }
    }

    pub(crate) fn intern(&self, s: &str) -> InternedString {
        if s.is_empty() {
            return InternedString::from_str("");
        }

        let mut index = self.index.borrow_mut();
        if let Some(interned) = index.get(s) {
            return *interned;
        }

        let stored: &str = self.arena.alloc_str(s);
        let interned = InternedString::from_str(stored);
        index.insert(interned);
        interned
    }

    /// Borrow an interned string for the lifetime of the pool.
    ///
    /// `interned` must come from this pool.
    pub(crate) fn get<'s>(&'s self, interned: InternedString) -> &'s str {
        // Interned strings are only produced by this pool (or are
        // static) and the arena outlives every borrow of `self`.
        unsafe { &*interned.0 }
    }

    /// Interns and immediately borrows the string.
    pub fn intern_str<'s>(&'s self, s: &str) -> &'s str {
        let interned = self.intern(s);
        self.get(interned)
    }

    pub fn len(&self) -> usize {
        self.index.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::StringPool;

    #[test]
    fn keeps_the_same_string() {
        let s = StringPool::new();

        let interned = s.intern_str("hello");

        assert_eq!(interned, "hello");
    }

    #[test]
    fn does_not_reuse_the_pointer_of_the_input() {
        let s = StringPool::new();
        let input = "hello";

        let interned = s.intern_str(input);

        assert!(input.as_bytes().as_ptr() != interned.as_bytes().as_ptr());
    }

    #[test]
    fn reuses_the_pointer_for_repeated_input() {
        let s = StringPool::new();

        let interned1 = s.intern_str("world");
        let interned2 = s.intern_str("world");

        assert_eq!(interned1.as_bytes().as_ptr(), interned2.as_bytes().as_ptr());
        assert_eq!(1, s.len());
    }

    #[test]
    fn ignores_the_lifetime_of_the_input_string() {
        let s = StringPool::new();

        let interned = {
            let allocated_string = String::from("green");
            s.intern(&allocated_string)
        };

        assert_eq!(s.get(interned), "green");
    }

    #[test]
    fn empty_strings_are_not_stored() {
        let s = StringPool::new();

        assert_eq!(s.intern_str(""), "");
        assert!(s.is_empty());
    }

    fn return_populated_storage() -> (StringPool, *const u8) {
        let s = StringPool::new();
        let ptr = s.intern_str("hello").as_ptr();
        (s, ptr)
    }

    #[test]
    fn can_return_storage_populated_with_values() {
        let (s, ptr_val) = return_populated_storage();
        let interned = s.intern_str("hello");
        assert_eq!(interned.as_ptr(), ptr_val);
    }
}
