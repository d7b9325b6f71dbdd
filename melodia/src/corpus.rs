// Corpus assembly: many encoded items -> one delimited stream.
//
// Every item is followed by a run of `Delimiter` exactly `sequence_length`
// long, the same length the windower later slides over the stream. Any
// training window that touches two items therefore contains a delimiter
// run, and a window that starts inside a run sees only the boundary before
// the next item begins.
//
// The stream is persisted as one line of space-separated tokens. The
// vocabulary is derived from the assembled stream so it covers the
// delimiter and every symbol any item used.

use crate::error::Result;
use crate::symbol::{EncodedSequence, Symbol, SymbolSequence};
use crate::vocabulary::Vocabulary;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    stream: SymbolSequence,
    items: usize,
}

impl Corpus {
    /// Concatenate `items`, each followed by `delimiter_run` delimiters.
    pub fn assemble<'a, I>(items: I, delimiter_run: usize) -> Self
    where
        I: IntoIterator<Item = &'a EncodedSequence>,
    {
        let mut stream = SymbolSequence::new();
        let mut count = 0;
        for item in items {
            stream.extend_from(item);
            stream.push_run(Symbol::Delimiter, delimiter_run);
            count += 1;
        }
        Corpus { stream, items: count }
    }

    /// Wrap an already-delimited stream (e.g. read back from disk).
    pub fn from_stream(stream: SymbolSequence) -> Self {
        let items = count_items(&stream);
        Corpus { stream, items }
    }

    pub fn stream(&self) -> &SymbolSequence {
        &self.stream
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Number of items in the stream.
    pub fn item_count(&self) -> usize {
        self.items
    }

    pub fn build_vocabulary(&self) -> Vocabulary {
        Vocabulary::from_corpus(&self.stream)
    }

    /// The stream as vocabulary ids.
    pub fn to_ids(&self, vocabulary: &Vocabulary) -> Result<Vec<u32>> {
        vocabulary.encode(self.stream.as_slice())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.stream.to_string())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_stream(text.parse()?))
    }
}

/// Count maximal non-delimiter runs.
fn count_items(stream: &SymbolSequence) -> usize {
    let mut items = 0;
    let mut inside = false;
    for symbol in stream {
        match (symbol.is_delimiter(), inside) {
            (false, false) => {
                items += 1;
                inside = true;
            }
            (true, _) => inside = false,
            _ => {}
        }
    }
    items
}
