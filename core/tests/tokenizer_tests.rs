use fulltext_core::tokenizer::{tokenize, tokenize_query, TokenStream, Tokenizer};
use fulltext_core::Error;
use std::io::{self, Read};

#[test]
fn it_normalizes_case() {
    assert_eq!(tokenize_query("Hello"), vec!["hello"]);
    assert_eq!(tokenize_query("HELLO"), vec!["hello"]);
}

#[test]
fn it_keeps_emails_whole() {
    assert_eq!(tokenize_query("user@host.com"), vec!["user@host.com"]);
    assert_eq!(tokenize_query("Mail USER@HOST.COM!"), vec!["mail", "user@host.com"]);
}

#[test]
fn it_splits_on_spaces_and_newlines() {
    let toks = tokenize_query("Hello, world!\nHow are  you?\n");
    assert_eq!(toks, vec!["hello", "world", "how", "are", "you"]);
}

#[test]
fn it_assigns_consecutive_positions() {
    let toks = tokenize("a -- b\n\n c");
    let positions: Vec<usize> = toks.iter().map(|(_, p)| *p).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn punctuation_only_words_yield_nothing() {
    assert!(tokenize_query("!!! ... ---").is_empty());
}

#[test]
fn has_more_tokens_is_exact() {
    assert!(!Tokenizer::new("".as_bytes()).has_more_tokens());
    assert!(Tokenizer::new("a".as_bytes()).has_more_tokens());
    // Only punctuation: nothing would come out of next_token.
    assert!(!Tokenizer::new("?! ;".as_bytes()).has_more_tokens());

    let mut t = Tokenizer::new("one two".as_bytes());
    assert_eq!(t.next_token().unwrap().as_deref(), Some("one"));
    assert!(t.has_more_tokens());
    assert_eq!(t.next_token().unwrap().as_deref(), Some("two"));
    assert!(!t.has_more_tokens());
    assert_eq!(t.next_token().unwrap(), None);
}

/// Hands out `data` once, then fails every read.
struct FailAfter {
    data: &'static [u8],
    done: bool,
}

impl Read for FailAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done {
            return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        }
        self.done = true;
        let n = self.data.len().min(buf.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        Ok(n)
    }
}

#[test]
fn read_errors_surface_as_stream_read() {
    let mut t = Tokenizer::new(FailAfter { data: b"hello world ", done: false });
    assert_eq!(t.next_token().unwrap().as_deref(), Some("hello"));
    assert_eq!(t.next_token().unwrap().as_deref(), Some("world"));
    assert!(t.has_more_tokens());
    assert!(matches!(t.next_token(), Err(Error::StreamRead(_))));
    // Not restartable.
    assert_eq!(t.next_token().unwrap(), None);
}
