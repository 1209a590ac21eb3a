use crate::error::Result;
use crate::index::{drain, DocId, IdGenerator, IndexStats, InvertedIndex, Postings, PostingsList};
use crate::query::{Querier, QueryEngine};
use crate::tokenizer::Tokenizer;
use parking_lot::RwLock;
use std::io::Read;

/// An [`InvertedIndex`] behind one coarse lock.
///
/// Writers tokenize without holding the lock and only take it to apply one
/// whole document. Queries share the read lock and never observe a
/// half-written tail posting.
#[derive(Default)]
pub struct SharedIndex {
    inner: RwLock<InvertedIndex>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self { inner: RwLock::new(InvertedIndex::with_id_generator(ids)) }
    }

    pub fn index_document<R: Read>(&self, reader: R) -> Result<DocId> {
        let tokens = drain(&mut Tokenizer::new(reader))?;
        self.inner.write().insert_tokens(tokens)
    }

    /// Owned copy of a token's postings list.
    pub fn postings(&self, token: &str) -> Result<PostingsList> {
        self.inner.read().postings(token).map(<[_]>::to_vec)
    }

    pub fn stats(&self) -> IndexStats {
        self.inner.read().stats()
    }
}

impl Querier for SharedIndex {
    fn intersection(&self, tokens: &[&str]) -> Result<PostingsList> {
        let guard = self.inner.read();
        QueryEngine::new(&*guard).intersection(tokens)
    }

    fn phrase(&self, text: &str) -> Result<PostingsList> {
        let guard = self.inner.read();
        QueryEngine::new(&*guard).phrase(text)
    }
}
