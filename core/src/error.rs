use crate::DocId;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The document reader failed mid-stream.
    #[error("read token stream: {0}")]
    StreamRead(#[from] std::io::Error),
    /// Query referenced a token that was never indexed.
    #[error("token '{0}' not found in index")]
    TokenNotFound(String),
    #[error("no tokens provided")]
    NoTokensProvided,
    /// The id generator handed out an id that would break postings order.
    #[error("doc id {id} is not greater than last assigned id {last}")]
    NonMonotonicDocId { id: DocId, last: DocId },
}

pub type Result<T> = std::result::Result<T, Error>;
