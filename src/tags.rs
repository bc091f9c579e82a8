//! Interning of tag strings to dense integer IDs.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::errors::{Result, SeqSvmError};

/// Registry interning tag strings (e.g. POS tags) to dense `u32` IDs.
///
/// The first registration of a tag assigns the next unused ID, counting up
/// from 0; repeated registrations return the same ID. IDs are never
/// reassigned or reused, so tag IDs embedded in [`Label`](crate::Label)s
/// stay valid for the lifetime of the registry.
///
/// The registry is an explicit context object with a single-writer
/// lifecycle: it is populated while reading a corpus and must be treated as
/// read-only once training starts.
///
/// # Examples
///
/// ```
/// use seqsvm::TagRegistry;
///
/// let mut registry = TagRegistry::new();
/// assert_eq!(0, registry.register_tag("N"));
/// assert_eq!(1, registry.register_tag("V"));
/// assert_eq!(0, registry.register_tag("N"));
/// assert_eq!(2, registry.num_tags());
/// assert_eq!("V", registry.tag_by_id(1).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct TagRegistry {
    ids: HashMap<String, u32>,
    tags: Vec<String>,
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID of the given tag, assigning the next unused ID if the
    /// tag has not been seen before.
    pub fn register_tag(&mut self, tag: &str) -> u32 {
        if let Some(&id) = self.ids.get(tag) {
            id
        } else {
            let id = u32::try_from(self.tags.len()).unwrap();
            self.ids.insert(tag.to_string(), id);
            self.tags.push(tag.to_string());
            id
        }
    }

    /// Returns the number of distinct tags registered so far.
    #[must_use]
    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    /// Returns the tag string for the given ID.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when
    /// `id >= num_tags()`.
    pub fn tag_by_id(&self, id: u32) -> Result<&str> {
        self.tags
            .get(usize::try_from(id).unwrap())
            .map(String::as_str)
            .ok_or_else(|| SeqSvmError::invalid_argument("id", format!("unknown tag ID: {id}")))
    }
}
