use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved identifier of the cash account.
pub const CASH: &str = "CASH";

/// An asset identifier, e.g. `"GOOG"` or the reserved `"CASH"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn cash() -> Self {
        Self(CASH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_cash(&self) -> bool {
        self.0 == CASH
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<&String> for AssetId {
    fn from(symbol: &String) -> Self {
        Self::new(symbol.as_str())
    }
}

/// The ordered universe of a request.
///
/// Assets are kept in lexicographic order so that the model built from a set is
/// identical from one run to the next. Exactly one member is the cash account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet {
    assets: Vec<AssetId>,
    cash: usize,
}

impl AssetSet {
    /// Builds the set from identifiers that are already known to be unique and to
    /// contain `CASH`. Returns `None` otherwise.
    pub fn new(mut assets: Vec<AssetId>) -> Option<Self> {
        assets.sort();
        assets.dedup();
        let cash = assets.iter().position(AssetId::is_cash)?;
        Some(Self { assets, cash })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Position of the cash account.
    pub fn cash_index(&self) -> usize {
        self.cash
    }

    pub fn position(&self, asset: &AssetId) -> Option<usize> {
        self.assets.binary_search(asset).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &AssetId)> {
        self.assets.iter().enumerate()
    }

    /// Every asset except cash, with its position in the set.
    pub fn non_cash(&self) -> impl Iterator<Item = (usize, &AssetId)> {
        let cash = self.cash;
        self.iter().filter(move |(i, _)| *i != cash)
    }
}
