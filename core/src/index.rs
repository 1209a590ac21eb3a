use crate::error::{Error, Result};
use crate::tokenizer::{TokenStream, Tokenizer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

pub type DocId = u64;

/// One document's occurrences of a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
    /// Zero-based token offsets, ascending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocId, position: u32) -> Self {
        Self { doc_id, frequency: 1, positions: vec![position] }
    }
}

/// Postings for one token, strictly ascending by doc_id.
pub type PostingsList = Vec<Posting>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub num_docs: u64,
    pub num_tokens: usize,
}

/// Read access to postings lists. This is all the query engine needs.
pub trait Postings {
    fn postings(&self, token: &str) -> Result<&[Posting]>;
}

pub trait Index: Postings {
    fn index_stream(&mut self, stream: &mut dyn TokenStream) -> Result<DocId>;

    fn index_document(&mut self, reader: &mut dyn Read) -> Result<DocId> {
        self.index_stream(&mut Tokenizer::new(reader))
    }
}

/// Source of document ids. Ids must be strictly increasing across calls.
pub trait IdGenerator: Send + Sync {
    fn next_id(&mut self) -> DocId;
}

impl<F: FnMut() -> DocId + Send + Sync> IdGenerator for F {
    fn next_id(&mut self) -> DocId {
        self()
    }
}

/// In-process counter starting at 0.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: DocId,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> DocId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Millisecond timestamp in the high bits, a sequence number in the low 16.
/// Falls back to last + 1 when the clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct TimeOrderedIds {
    last: Option<DocId>,
}

impl TimeOrderedIds {
    const SEQ_BITS: u32 = 16;
}

impl IdGenerator for TimeOrderedIds {
    fn next_id(&mut self) -> DocId {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
        let candidate = millis << Self::SEQ_BITS;
        let id = match self.last {
            Some(last) if candidate <= last => last + 1,
            _ => candidate,
        };
        self.last = Some(id);
        id
    }
}

pub struct InvertedIndex {
    dict: HashMap<String, PostingsList>,
    ids: Box<dyn IdGenerator>,
    last_id: Option<DocId>,
    num_docs: u64,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::with_id_generator(SequentialIds::default())
    }

    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self { dict: HashMap::new(), ids: Box::new(ids), last_id: None, num_docs: 0 }
    }

    pub fn num_docs(&self) -> u64 { self.num_docs }

    pub fn num_tokens(&self) -> usize { self.dict.len() }

    pub fn stats(&self) -> IndexStats {
        IndexStats { num_docs: self.num_docs, num_tokens: self.dict.len() }
    }

    /// Adds an already tokenized document. The token order defines positions.
    pub fn insert_tokens<I>(&mut self, tokens: I) -> Result<DocId>
    where
        I: IntoIterator<Item = String>,
    {
        let doc_id = self.ids.next_id();
        if let Some(last) = self.last_id {
            // The tail-only lookup below relies on this.
            if doc_id <= last {
                return Err(Error::NonMonotonicDocId { id: doc_id, last });
            }
        }
        self.last_id = Some(doc_id);
        self.num_docs += 1;

        let mut position: u32 = 0;
        for token in tokens {
            let list = self.dict.entry(token).or_default();
            match list.last_mut() {
                Some(tail) if tail.doc_id == doc_id => {
                    tail.frequency += 1;
                    tail.positions.push(position);
                }
                _ => list.push(Posting::new(doc_id, position)),
            }
            position += 1;
        }
        tracing::debug!(doc_id, num_tokens = position, "indexed document");
        Ok(doc_id)
    }
}

impl Postings for InvertedIndex {
    fn postings(&self, token: &str) -> Result<&[Posting]> {
        self.dict
            .get(token)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::TokenNotFound(token.to_string()))
    }
}

impl Index for InvertedIndex {
    /// The stream is drained before the index is touched, so a read error
    /// leaves the index unchanged and burns no doc id.
    fn index_stream(&mut self, stream: &mut dyn TokenStream) -> Result<DocId> {
        let tokens = drain(stream)?;
        self.insert_tokens(tokens)
    }
}

pub(crate) fn drain(stream: &mut dyn TokenStream) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    while stream.has_more_tokens() {
        match stream.next_token()? {
            Some(t) => tokens.push(t),
            None => break,
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(idx: &mut InvertedIndex, text: &str) -> DocId {
        idx.index_document(&mut text.as_bytes()).unwrap()
    }

    #[test]
    fn positions_and_frequency_accumulate_on_tail() {
        let mut idx = InvertedIndex::new();
        let id = doc(&mut idx, "to be or not to be");
        assert_eq!(id, 0);
        assert_eq!(idx.postings("to").unwrap(), &[Posting { doc_id: 0, frequency: 2, positions: vec![0, 4] }]);
        assert_eq!(idx.postings("be").unwrap(), &[Posting { doc_id: 0, frequency: 2, positions: vec![1, 5] }]);
        assert_eq!(idx.postings("or").unwrap()[0].frequency, 1);
    }

    #[test]
    fn unknown_token_is_an_error() {
        let idx = InvertedIndex::new();
        assert!(matches!(idx.postings("nope"), Err(Error::TokenNotFound(t)) if t == "nope"));
    }

    #[test]
    fn rejects_non_increasing_ids() {
        let mut idx = InvertedIndex::with_id_generator(|| 7);
        assert_eq!(doc(&mut idx, "a"), 7);
        let err = idx.index_document(&mut "b".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::NonMonotonicDocId { id: 7, last: 7 }));
        assert!(idx.postings("b").is_err());
        assert_eq!(idx.num_docs(), 1);
    }

    #[test]
    fn time_ordered_ids_strictly_increase() {
        let mut ids = TimeOrderedIds::default();
        let mut prev = ids.next_id();
        for _ in 0..1000 {
            let id = ids.next_id();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn empty_document_still_gets_an_id() {
        let mut idx = InvertedIndex::new();
        assert_eq!(doc(&mut idx, "?!"), 0);
        assert_eq!(doc(&mut idx, "x"), 1);
        assert_eq!(idx.stats(), IndexStats { num_docs: 2, num_tokens: 1 });
    }
}
