pub mod error;
pub mod index;
pub mod query;
pub mod shared;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{DocId, Index, IdGenerator, IndexStats, InvertedIndex, Posting, Postings, PostingsList, SequentialIds, TimeOrderedIds};
pub use query::{Querier, QueryEngine};
pub use shared::SharedIndex;
pub use tokenizer::{tokenize, tokenize_query, TokenStream, Tokenizer};
