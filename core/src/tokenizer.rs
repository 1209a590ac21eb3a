use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;
use std::io::{self, BufReader, Bytes, Read};

lazy_static! {
    /// Token patterns, most specific first. Every match is cut out of the word
    /// before the next pattern runs, so later patterns never split an earlier hit.
    static ref PATTERNS: Vec<Regex> = [
        r"https?://[^\s]*[\p{L}\p{N}/]",                                     // web addresses
        r"[\p{L}\p{N}._+-]+@[\p{L}\p{N}-]+(?:\.[\p{L}\p{N}-]+)*\.[\p{L}\p{N}]+", // email addresses
        r"\b(?:a\.m|p\.m|a\.d|b\.c|e\.g|i\.e)\.",                            // abbreviations
        r"[\p{L}\p{N}_-]+\.(?:txt|md|pdf|docx?|xlsx?|csv|json|xml|html?|rs|go|py|js|ts|c|h|cpp|java|sh|toml|ya?ml|png|jpe?g|gif|zip|tar|gz|log)\b", // filenames
        r"\$\d+(?:[.,]\d+)*",                                                // usd amounts
        r"\+\d+(?:-\d+)*",                                                   // phone numbers
        r"\b\d{1,2}:\d{2}(?::\d{2})?\b",                                     // time
        r"\p{L}[\p{L}\p{N}]*(?:-[\p{L}\p{N}]+)+",                            // hyphenated compounds
        r"\d+(?:[.,/-]\d+)+",                                                // grouped numbers, 24/7
        r"[\p{L}\p{N}]+'[\p{L}\p{N}]+",                                      // contractions
        r"'em\b",                                                            // 'em
        r"[\p{L}\p{N}]+",                                                    // everything else
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid token pattern"))
    .collect();
}

/// A lazy, non-restartable sequence of normalized tokens.
pub trait TokenStream {
    /// True iff the next call to `next_token` yields a token or surfaces a read error.
    fn has_more_tokens(&mut self) -> bool;

    /// Advance and return the next token, `None` once the stream is exhausted.
    fn next_token(&mut self) -> Result<Option<String>>;
}

/// Splits a byte stream into words on spaces and newlines, then decomposes
/// each word into tokens with [`PATTERNS`].
pub struct Tokenizer<R> {
    bytes: Bytes<BufReader<R>>,
    queue: VecDeque<String>,
    exhausted: bool,
    pending: Option<io::Error>,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            queue: VecDeque::new(),
            exhausted: false,
            pending: None,
        }
    }

    /// Reads the next lower-cased word. `None` at end of stream.
    fn read_word(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut word = Vec::new();
        for b in self.bytes.by_ref() {
            match b? {
                b' ' | b'\n' => {
                    if word.is_empty() {
                        continue;
                    }
                    return Ok(Some(word));
                }
                b => word.push(b.to_ascii_lowercase()),
            }
        }
        self.exhausted = true;
        Ok(if word.is_empty() { None } else { Some(word) })
    }

    /// Pulls words until the queue holds a token or the stream runs dry.
    fn fill(&mut self) -> io::Result<()> {
        while self.queue.is_empty() && !self.exhausted {
            match self.read_word() {
                Ok(Some(word)) => decompose(&word_text(word), &mut self.queue),
                Ok(None) => break,
                Err(err) => {
                    self.exhausted = true;
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

impl<R: Read> TokenStream for Tokenizer<R> {
    fn has_more_tokens(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        if let Err(err) = self.fill() {
            self.pending = Some(err);
            return true;
        }
        !self.queue.is_empty()
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        if let Some(err) = self.pending.take() {
            return Err(Error::StreamRead(err));
        }
        self.fill()?;
        Ok(self.queue.pop_front())
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

fn word_text(word: Vec<u8>) -> String {
    match String::from_utf8(word) {
        Ok(s) if s.is_ascii() => s,
        Ok(s) => s.to_lowercase(),
        Err(err) => String::from_utf8_lossy(err.as_bytes()).to_lowercase(),
    }
}

/// Queues every pattern match in `word`, pattern by pattern. Matched text is
/// replaced with a space so the leftovers on either side never fuse.
fn decompose(word: &str, out: &mut VecDeque<String>) {
    let mut rest = word.to_string();
    for re in PATTERNS.iter() {
        if rest.trim().is_empty() {
            break;
        }
        let before = out.len();
        out.extend(re.find_iter(&rest).map(|m| m.as_str().to_string()));
        if out.len() > before {
            rest = re.replace_all(&rest, " ").into_owned();
        }
    }
}

/// Tokenize in-memory text into (token, position) pairs.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    // Reading from a byte slice cannot fail.
    Tokenizer::new(text.as_bytes())
        .filter_map(|t| t.ok())
        .enumerate()
        .map(|(pos, t)| (t, pos))
        .collect()
}

/// Tokenize a query string with the same normalization used at index time.
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query).into_iter().map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize_query(text)
    }

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Hello, world!");
        assert_eq!(t, vec![("hello".to_string(), 0), ("world".to_string(), 1)]);
    }

    #[test]
    fn decompose_runs_patterns_in_priority_order() {
        let mut out = VecDeque::new();
        decompose("hello,user@host.com", &mut out);
        assert_eq!(out, ["user@host.com", "hello"]);
    }

    #[test]
    fn stripped_matches_do_not_fuse_leftovers() {
        // Without a separator "ab" and "cd" would merge into one token.
        assert_eq!(words("ab(x@y.io)cd"), vec!["x@y.io", "ab", "cd"]);
    }

    #[test]
    fn structured_tokens() {
        assert_eq!(words("https://example.com/path?q=1."), vec!["https://example.com/path?q=1"]);
        assert_eq!(words("(e.g."), vec!["e.g."]);
        assert_eq!(words("p.m.,"), vec!["p.m."]);
        assert_eq!(words("report.pdf,"), vec!["report.pdf"]);
        assert_eq!(words("$1,000.50"), vec!["$1,000.50"]);
        assert_eq!(words("+46-70-1234"), vec!["+46-70-1234"]);
        assert_eq!(words("12:30"), vec!["12:30"]);
        assert_eq!(words("9:05:59,"), vec!["9:05:59"]);
        assert_eq!(words("state-of-the-art"), vec!["state-of-the-art"]);
        assert_eq!(words("2024-01-15"), vec!["2024-01-15"]);
        assert_eq!(words("24/7"), vec!["24/7"]);
        assert_eq!(words("don't"), vec!["don't"]);
        assert_eq!(words("'em"), vec!["'em"]);
    }

    #[test]
    fn abbreviations_and_times_need_a_word_start() {
        assert_eq!(words("obama.m."), vec!["obama", "m"]);
        assert_eq!(words("10a.m."), vec!["10a", "m"]);
        assert_eq!(words("123:45"), vec!["123", "45"]);
        assert_eq!(words("12:345"), vec!["12", "345"]);
    }

    #[test]
    fn non_ascii_is_case_folded() {
        assert_eq!(words("CAFÉ Ünter"), vec!["café", "ünter"]);
    }
}
