//! Name interning for type handles
//!
//! Class names arrive from the metadata store as text. The oracle interns
//! them so that two handles carry the same [`NameRef`] exactly when their
//! names are textually equal. One interner lives inside each oracle, so
//! names are canonical per session.

use rustc_hash::FxHashMap;
use std::num::NonZeroU32;

/// An interned class name (32-bit index).
///
/// Copyable and compared in O(1). Use [`NameInterner::resolve`] to get the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameRef(NonZeroU32);

impl NameRef {
    #[inline]
    fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(NameRef)
    }

    #[inline]
    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Deduplicating store of class names.
#[derive(Debug, Clone, Default)]
pub struct NameInterner {
    /// Map from text to name
    map: FxHashMap<Box<str>, NameRef>,

    /// Names in allocation order
    names: Vec<Box<str>>,
}

impl NameInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing handle if the text was seen before.
    ///
    /// Returns `None` once the 32-bit name space is used up.
    pub fn intern(&mut self, text: &str) -> Option<NameRef> {
        if let Some(&name) = self.map.get(text) {
            return Some(name);
        }

        let name = NameRef::from_index(self.names.len())?;
        self.names.push(text.into());
        self.map.insert(text.into(), name);
        Some(name)
    }

    /// Look up a name without interning it.
    pub fn get(&self, text: &str) -> Option<NameRef> {
        self.map.get(text).copied()
    }

    /// Resolve a name back to its text.
    ///
    /// # Panics
    ///
    /// Panics if the name came from a different interner.
    #[inline]
    pub fn resolve(&self, name: NameRef) -> &str {
        &self.names[name.index()]
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
