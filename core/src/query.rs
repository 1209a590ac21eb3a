use crate::error::{Error, Result};
use crate::index::{Posting, Postings, PostingsList};
use crate::tokenizer::tokenize_query;
use std::cmp::Ordering;

pub trait Querier {
    /// Documents containing every token.
    fn intersection(&self, tokens: &[&str]) -> Result<PostingsList>;

    /// Documents containing the tokens of `text` as one contiguous run.
    fn phrase(&self, text: &str) -> Result<PostingsList>;

    /// Tokenizes `query` like a document, then intersects the tokens.
    fn boolean(&self, query: &str) -> Result<PostingsList> {
        let tokens = tokenize_query(query);
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.intersection(&refs)
    }
}

/// Evaluates queries against anything that can hand out postings lists.
pub struct QueryEngine<'a, P: Postings + ?Sized> {
    index: &'a P,
}

impl<'a, P: Postings + ?Sized> QueryEngine<'a, P> {
    pub fn new(index: &'a P) -> Self {
        Self { index }
    }

    fn fetch<'t, I>(&self, tokens: I) -> Result<Vec<&'a [Posting]>>
    where
        I: IntoIterator<Item = &'t str>,
    {
        tokens.into_iter().map(|t| self.index.postings(t)).collect()
    }
}

impl<P: Postings + ?Sized> Querier for QueryEngine<'_, P> {
    fn intersection(&self, tokens: &[&str]) -> Result<PostingsList> {
        if tokens.is_empty() {
            return Err(Error::NoTokensProvided);
        }
        let mut lists = self.fetch(tokens.iter().copied())?;

        // Start with the shortest list and keep the running result as small as possible.
        lists.sort_by_key(|l| l.len());
        let (first, rest) = lists.split_first().ok_or(Error::NoTokensProvided)?;
        let mut res: PostingsList = first.to_vec();
        for l in rest {
            if res.is_empty() {
                break;
            }
            res = intersect(&res, l);
        }
        tracing::trace!(tokens = tokens.len(), hits = res.len(), "intersection");
        Ok(res)
    }

    fn phrase(&self, text: &str) -> Result<PostingsList> {
        let tokens = tokenize_query(text);
        if tokens.is_empty() {
            return Err(Error::NoTokensProvided);
        }
        let lists = self.fetch(tokens.iter().map(String::as_str))?;

        let (first, rest) = lists.split_first().ok_or(Error::NoTokensProvided)?;
        let mut res: PostingsList = first.to_vec();
        for l in rest {
            if res.is_empty() {
                break;
            }
            res = adjacent(&res, l);
        }
        tracing::trace!(tokens = tokens.len(), hits = res.len(), "phrase");
        Ok(res)
    }
}

/// Common doc ids of two sorted postings lists. Frequency is the smaller of
/// the two; positions are dropped.
pub fn intersect(a: &[Posting], b: &[Posting]) -> PostingsList {
    let mut res = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Equal => {
                res.push(Posting {
                    doc_id: a[i].doc_id,
                    frequency: a[i].frequency.min(b[j].frequency),
                    positions: Vec::new(),
                });
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    res
}

/// Documents where some position in `right` directly follows a position in
/// `left`. The result keeps the matching right-hand positions so the next
/// fold can extend the phrase from there.
pub fn adjacent(left: &[Posting], right: &[Posting]) -> PostingsList {
    let mut res = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let (l, r) = (&left[i], &right[j]);
        match l.doc_id.cmp(&r.doc_id) {
            Ordering::Equal => {
                let positions = following_positions(&l.positions, &r.positions);
                if !positions.is_empty() {
                    res.push(Posting {
                        doc_id: l.doc_id,
                        frequency: l.frequency.min(r.frequency),
                        positions,
                    });
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    res
}

/// Every `q` in `right` with a `p` in `left` such that `p + 1 == q`.
/// Both inputs are ascending, so one linear walk suffices.
fn following_positions(left: &[u32], right: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let want = left[i] + 1;
        match want.cmp(&right[j]) {
            Ordering::Equal => {
                out.push(right[j]);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}
