//! Pattern and label sequences with structural sharing.
//!
//! Both containers keep their storage behind a shared, reference-counted
//! handle: cloning is O(1) and the clone aliases the original. There is no
//! copy-on-write isolation. A mutation through one handle is visible
//! through every handle sharing the same storage, which in-place decoders
//! rely on; call [`Pattern::detach`]/[`Label::detach`] first when an
//! independent copy is needed.

use core::cell::{RefCell, RefMut};

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::token::Token;

/// The x-part of an example: an ordered sequence of [`Token`]s.
///
/// Sequence order is the positional order in the original text and is never
/// reordered. Appending is intended for corpus construction, before the
/// pattern is shared.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    tokens: Rc<RefCell<Vec<Token>>>,
}

impl Pattern {
    /// Creates an empty pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.borrow().len()
    }

    /// Returns `true` if the pattern has no token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.borrow().is_empty()
    }

    /// Returns the token at the given position.
    ///
    /// The returned token is an O(1) copy sharing its feature vector with
    /// the stored one.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    #[must_use]
    pub fn get_token(&self, index: usize) -> Token {
        self.tokens.borrow()[index].clone()
    }

    /// Returns a mutable handle to the token at the given position.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    pub fn token_mut(&self, index: usize) -> RefMut<'_, Token> {
        RefMut::map(self.tokens.borrow_mut(), |tokens| &mut tokens[index])
    }

    /// Appends a token.
    pub fn append_token(&mut self, token: Token) {
        self.tokens.borrow_mut().push(token);
    }

    /// Returns the last token, or `None` for an empty pattern.
    #[must_use]
    pub fn last_token(&self) -> Option<Token> {
        self.tokens.borrow().last().cloned()
    }

    /// Replaces the shared storage with an unshared copy of its contents.
    ///
    /// After this call, mutations through `self` are no longer visible
    /// through handles that previously aliased it.
    pub fn detach(&mut self) {
        if Rc::strong_count(&self.tokens) > 1 {
            let tokens = self.tokens.borrow().clone();
            self.tokens = Rc::new(RefCell::new(tokens));
        }
    }
}

/// The y-part of an example: an ordered sequence of tag IDs.
///
/// An empty label is a valid value meaning "no label": it marks an example
/// as unlabeled rather than signaling an error.
///
/// The mutating methods exist so a decoder can write a candidate sequence
/// in place; a decoder must either own a freshly constructed label or
/// [`detach`](Self::detach) a shared one before mutating it.
#[derive(Clone, Debug, Default)]
pub struct Label {
    tags: Rc<RefCell<Vec<u32>>>,
}

impl Label {
    /// Creates an empty label.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a label from a slice of tag IDs.
    #[must_use]
    pub fn from_tags(tags: &[u32]) -> Self {
        Self {
            tags: Rc::new(RefCell::new(tags.to_vec())),
        }
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.borrow().len()
    }

    /// Returns `true` if the label holds no tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.borrow().is_empty()
    }

    /// Returns the tag ID at the given position.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    #[must_use]
    pub fn get_tag(&self, index: usize) -> u32 {
        self.tags.borrow()[index]
    }

    /// Overwrites the tag ID at the given position.
    ///
    /// The write is visible through every handle sharing this storage.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    pub fn set_tag(&mut self, index: usize, id: u32) {
        self.tags.borrow_mut()[index] = id;
    }

    /// Appends a tag ID.
    pub fn append_tag(&mut self, id: u32) {
        self.tags.borrow_mut().push(id);
    }

    /// Returns the last tag ID, or `None` for an empty label.
    #[must_use]
    pub fn last_tag(&self) -> Option<u32> {
        self.tags.borrow().last().copied()
    }

    /// Resizes the label to the given length, filling new positions with
    /// tag 0.
    pub fn set_len(&mut self, len: usize) {
        self.tags.borrow_mut().resize(len, 0);
    }

    /// Replaces the shared storage with an unshared copy of its contents.
    pub fn detach(&mut self) {
        if Rc::strong_count(&self.tags) > 1 {
            let tags = self.tags.borrow().clone();
            self.tags = Rc::new(RefCell::new(tags));
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.tags, &other.tags) {
            return true;
        }
        *self.tags.borrow() == *other.tags.borrow()
    }
}

impl Eq for Label {}
