// Symbol <-> integer id mapping.
//
// Built once from the complete corpus stream, then frozen. Ids are assigned
// in `Symbol` order (pitches ascending, then rest, hold, delimiter), so the
// same corpus always yields the same mapping. Downstream one-hot positions
// and trained predictor weights depend on these ids, which is why the
// mapping is persisted next to the model and never edited in place.
//
// Both directions are pre-built: `symbols` is indexed by id, `ids` is keyed
// by symbol. Every component that translates between the two receives a
// `&Vocabulary`; there is no global instance.
//
// On disk the mapping is a JSON object `{ "<token>": <id>, ... }`. Loading
// rejects files that are not a bijection onto 0..len.

use crate::error::{MelodiaError, Result};
use crate::symbol::{Symbol, SymbolSequence};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: Vec<Symbol>,
    ids: HashMap<Symbol, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from every distinct symbol in `stream`.
    pub fn from_corpus(stream: &SymbolSequence) -> Self {
        let distinct: BTreeSet<Symbol> = stream.iter().copied().collect();
        Self::from_symbols(distinct)
    }

    fn from_symbols(distinct: BTreeSet<Symbol>) -> Self {
        let symbols: Vec<Symbol> = distinct.into_iter().collect();
        let ids = symbols
            .iter()
            .enumerate()
            .map(|(id, &symbol)| (symbol, id as u32))
            .collect();
        Vocabulary { symbols, ids }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn id_of(&self, symbol: Symbol) -> Result<u32> {
        self.ids
            .get(&symbol)
            .copied()
            .ok_or_else(|| MelodiaError::UnknownSymbol(symbol.to_string()))
    }

    pub fn symbol_of(&self, id: u32) -> Result<Symbol> {
        self.symbols
            .get(id as usize)
            .copied()
            .ok_or(MelodiaError::UnknownId(id))
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.ids.contains_key(&symbol)
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Map a symbol sequence to ids. Fails on the first unknown symbol.
    pub fn encode(&self, symbols: &[Symbol]) -> Result<Vec<u32>> {
        symbols.iter().map(|&s| self.id_of(s)).collect()
    }

    /// Map ids back to symbols. Fails on the first unknown id.
    pub fn decode(&self, ids: &[u32]) -> Result<SymbolSequence> {
        ids.iter().map(|&id| self.symbol_of(id)).collect()
    }

    /// The textual mapping, keyed by token.
    pub fn to_mapping(&self) -> BTreeMap<String, u32> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(id, s)| (s.to_string(), id as u32))
            .collect()
    }

    /// Rebuild from a textual mapping, checking that ids cover 0..len exactly once.
    pub fn from_mapping(mapping: &BTreeMap<String, u32>) -> Result<Self> {
        let mut slots: Vec<Option<Symbol>> = vec![None; mapping.len()];
        for (token, &id) in mapping {
            let symbol: Symbol = token.parse()?;
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                MelodiaError::InvalidVocabulary(format!(
                    "id {id} for '{token}' is outside 0..{}",
                    mapping.len()
                ))
            })?;
            if let Some(existing) = slot {
                return Err(MelodiaError::InvalidVocabulary(format!(
                    "id {id} assigned to both '{existing}' and '{token}'"
                )));
            }
            *slot = Some(symbol);
        }

        let symbols: Vec<Symbol> = slots.into_iter().flatten().collect();
        let mut ids = HashMap::with_capacity(symbols.len());
        for (id, &symbol) in symbols.iter().enumerate() {
            if ids.insert(symbol, id as u32).is_some() {
                return Err(MelodiaError::InvalidVocabulary(format!(
                    "symbol '{symbol}' appears under more than one token"
                )));
            }
        }
        Ok(Vocabulary { symbols, ids })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_mapping())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: BTreeMap<String, u32> = serde_json::from_str(json)?;
        Self::from_mapping(&mapping)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}
