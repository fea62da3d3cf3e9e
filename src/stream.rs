use crate::filters;
use crate::{Dictionary, Result};

/// A stream object: a dictionary plus an associated sequence of bytes (spec §4.9). `content`
/// holds the bytes exactly as they sit between `stream`/`endstream` in the source file (still
/// filtered); decoding happens on demand through [`Stream::decompressed_content`] rather than
/// eagerly, so a caller that only wants `/Length` or `/Filter` never pays for inflate/LZW.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    /// Set once a stream's content has been modified after load, so the writer knows to
    /// recompute `/Length` instead of trusting the dictionary's original value.
    pub allows_compression: bool,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Stream {
            dict,
            content,
            allows_compression: true,
        }
    }

    /// Runs `content` through every filter named in `/Filter` (normalizing the single-name and
    /// array-of-names forms), applying each `/DecodeParms` entry in turn.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        filters::decode(&self.dict, &self.content)
    }

    /// Replaces the stream's content with `data` already encoded per its current `/Filter`
    /// chain, and fixes up `/Length` to match.
    pub fn set_content(&mut self, data: Vec<u8>) {
        self.dict.set("Length", data.len() as i64);
        self.content = data;
    }

    /// Replaces the stream's content with raw (unfiltered) `data`, dropping any existing
    /// `/Filter`/`/DecodeParms` so the bytes are stored as-is. Callers that want the data
    /// compressed should apply a filter first and call [`Stream::set_content`] instead.
    pub fn set_plain_content(&mut self, data: Vec<u8>) {
        self.dict.remove(b"Filter");
        self.dict.remove(b"DecodeParms");
        self.set_content(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn set_content_updates_length() {
        let mut stream = Stream::new(dictionary! {}, vec![1, 2, 3]);
        stream.set_content(vec![1, 2, 3, 4, 5]);
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), 5);
    }

    #[test]
    fn uncompressed_round_trips_through_decompressed_content() {
        let stream = Stream::new(dictionary! {}, b"hello".to_vec());
        assert_eq!(stream.decompressed_content().unwrap(), b"hello");
    }
}
