//! Append-only interned text storage.
//!
//! [`CharBuffer`] packs strings back to back in one allocation and hands
//! out `(offset, len)` spans. [`HashedCharBuffer`] adds an exact-match
//! index on top so each distinct string is stored once and identified by
//! a small integer reference.

use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::hash::{hash32, DefaultHashBuilder};
use crate::hash_bucket::HashBucket;
use crate::options::StorageOptions;
use crate::size_policy::SizePolicy;

/// Location of one string inside a [`CharBuffer`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    offset: u32,
    len: u32,
}

impl TextSpan {
    fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}

/// Strings packed into a single growable buffer.
#[derive(Debug, Default, Clone)]
pub struct CharBuffer {
    text: String,
}

impl CharBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
        }
    }

    /// Appends `s`, returning its span. Offsets are 32-bit, so the buffer
    /// refuses text that would push it past `u32::MAX` bytes.
    pub fn push(&mut self, s: &str) -> Result<TextSpan> {
        let offset = u32::try_from(self.text.len())
            .map_err(|_| CoreError::TextTooLong { len: s.len() })?;
        let len = u32::try_from(s.len()).map_err(|_| CoreError::TextTooLong { len: s.len() })?;
        if offset.checked_add(len).is_none() {
            return Err(CoreError::TextTooLong { len: s.len() });
        }

        self.text.push_str(s);
        Ok(TextSpan { offset, len })
    }

    /// Text behind `span`. Spans from another buffer may not land on
    /// character boundaries, in which case `None` is returned.
    pub fn get(&self, span: TextSpan) -> Option<&str> {
        self.text.get(span.range())
    }

    /// Bytes stored.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.text.capacity()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Interned {
    span: TextSpan,
    hash: u32,
}

/// Deduplicating string store. Equal strings get equal references.
#[derive(Debug)]
pub struct HashedCharBuffer<S = DefaultHashBuilder> {
    chars: CharBuffer,
    entries: Vec<Interned>,
    index: HashBucket<u32>,
    policy: SizePolicy,
    hasher: S,
}

impl HashedCharBuffer {
    pub fn new(options: &StorageOptions) -> Result<Self> {
        Self::with_hasher(options, DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher> HashedCharBuffer<S> {
    pub fn with_hasher(options: &StorageOptions, hasher: S) -> Result<Self> {
        Ok(Self {
            chars: CharBuffer::with_capacity(options.initial_char_capacity),
            entries: Vec::new(),
            index: HashBucket::new(options.initial_capacity(), options.chunk_size)?,
            policy: options.validate()?,
            hasher,
        })
    }

    /// Number of distinct strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes of interned text.
    pub fn text_len(&self) -> usize {
        self.chars.len()
    }

    /// Reference of `text` if it was interned before.
    pub fn find(&self, text: &str) -> Option<u32> {
        self.find_hashed(text, hash32(&self.hasher, text))
    }

    fn find_hashed(&self, text: &str, hash: u32) -> Option<u32> {
        self.index
            .retrieve(hash)
            .map(|(_, id)| *id)
            .find(|&id| {
                let entry = self.entries[id as usize];
                entry.hash == hash && self.chars.get(entry.span) == Some(text)
            })
    }

    /// Stores `text` once and returns its reference.
    pub fn intern(&mut self, text: &str) -> Result<u32> {
        let hash = hash32(&self.hasher, text);
        if let Some(id) = self.find_hashed(text, hash) {
            return Ok(id);
        }

        let id = u32::try_from(self.entries.len())
            .map_err(|_| CoreError::InvalidParameter("too many interned strings".into()))?;
        let span = self.chars.push(text)?;
        self.entries.push(Interned { span, hash });

        if let Some(capacity) = self
            .policy
            .must_resize(self.index.usage() + 1, self.index.capacity())
        {
            self.rebuild(capacity)?;
        }
        if self.index.try_store(hash, id).is_err() {
            self.rebuild(self.policy.grown(self.index.capacity()))?;
            self.index
                .try_store(hash, id)
                .map_err(|_| CoreError::CapacityExhausted {
                    capacity: self.index.capacity(),
                })?;
        }
        Ok(id)
    }

    /// Text for a reference returned by [`intern`](Self::intern).
    pub fn get(&self, id: u32) -> Option<&str> {
        let entry = self.entries.get(id as usize)?;
        self.chars.get(entry.span)
    }

    /// Re-indexes every string stored so far (excluding any not yet
    /// placed) into a table of `capacity` slots.
    fn rebuild(&mut self, capacity: usize) -> Result<()> {
        let placed = self.index.usage();
        let capacity = capacity.max(placed + 1);
        self.index.reset(capacity);
        for (id, entry) in self.entries.iter().enumerate().take(placed) {
            self.index
                .try_store(entry.hash, id as u32)
                .map_err(|_| CoreError::CapacityExhausted { capacity })?;
        }
        debug!(capacity, strings = placed, "Rebuilt text index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StorageOptions {
        StorageOptions {
            capacity: 4,
            chunk_size: 2,
            min_capacity: 4,
            initial_char_capacity: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_char_buffer_spans() {
        let mut buffer = CharBuffer::with_capacity(4);
        let a = buffer.push("hello").unwrap();
        let b = buffer.push("/wörld").unwrap();

        assert_eq!(buffer.get(a), Some("hello"));
        assert_eq!(buffer.get(b), Some("/wörld"));
        assert_eq!(buffer.len(), "hello/wörld".len());
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut text = HashedCharBuffer::new(&options()).unwrap();
        let a = text.intern("/src").unwrap();
        let b = text.intern("/lib.rs").unwrap();
        let c = text.intern("/src").unwrap();

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(text.len(), 2);
        assert_eq!(text.text_len(), "/src/lib.rs".len());
        assert_eq!(text.get(b), Some("/lib.rs"));
    }

    #[test]
    fn test_intern_survives_index_growth() {
        let mut text = HashedCharBuffer::new(&options()).unwrap();
        let ids: Vec<_> = (0..500)
            .map(|i| text.intern(&format!("/segment{i}")).unwrap())
            .collect();

        for (i, id) in ids.iter().enumerate() {
            let name = format!("/segment{i}");
            assert_eq!(text.find(&name), Some(*id));
            assert_eq!(text.get(*id), Some(name.as_str()));
        }
        assert_eq!(text.len(), 500);
    }

    #[test]
    fn test_find_missing() {
        let mut text = HashedCharBuffer::new(&options()).unwrap();
        text.intern("present").unwrap();
        assert_eq!(text.find("absent"), None);
        assert_eq!(text.get(99), None);
    }

    #[test]
    fn test_empty_string_interns() {
        let mut text = HashedCharBuffer::new(&options()).unwrap();
        let id = text.intern("").unwrap();
        assert_eq!(text.get(id), Some(""));
        assert_eq!(text.intern("").unwrap(), id);
    }
}
