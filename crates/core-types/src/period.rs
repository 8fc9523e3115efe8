use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 1-based period index.
///
/// Weight periods run `1..=T+1` and trade periods `1..=T`. On the wire a period is
/// always its decimal string label (`"1"`, `"2"`, ...), so it can key a JSON object,
/// while maps keyed by `Period` still order numerically (`"2"` before `"10"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(u32);

impl Period {
    pub const FIRST: Period = Period(1);

    /// Returns `None` for zero, which is not a valid label.
    pub fn new(index: u32) -> Option<Self> {
        (index >= 1).then_some(Self(index))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based offset, convenient for indexing per-period vectors.
    pub fn offset(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Periods `1..=count`.
    pub fn range(count: usize) -> impl Iterator<Item = Period> + Clone {
        (1..=count as u32).map(Period)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let index: u32 = label
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not an integer period label", label))?;
        Period::new(index).ok_or_else(|| "period labels start at 1".to_string())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_period_labels_order_numerically() {
        let mut map = BTreeMap::new();
        for label in ["10", "2", "1"] {
            map.insert(label.parse::<Period>().unwrap(), label);
        }
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"1":"1","2":"2","10":"10"}"#);
    }

    #[test]
    fn test_period_rejects_zero_and_garbage() {
        assert!("0".parse::<Period>().is_err());
        assert!("first".parse::<Period>().is_err());
        assert_eq!(" 3 ".parse::<Period>().unwrap().get(), 3);
    }
}
