//! Plain data passed between the marketplace client, jobs and storage.

use std::fmt;
use std::ops::Range;

/// Numeric identifier of a card template.
pub type ProtoId = u32;

/// Exclusive upper bound of the proto ids scanned by default.
pub const PROTO_MAX: ProtoId = 1800;

/// Quality used when looking up a proto's market price.
pub const DEFAULT_QUALITY: &str = "Meteorite";

/// Best sell price of one proto at the time of the fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoPrice {
    /// The card template.
    pub proto: ProtoId,
    /// Price in wei; `0` when there was no active sell order.
    pub price_wei: u128,
}

/// One token held by a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Marketplace token id.
    pub token_id: String,
    /// Display name of the card.
    pub name: String,
    /// The card template.
    pub proto: ProtoId,
    /// Quality tier, e.g. `Meteorite`.
    pub quality: String,
}

/// A tracked wallet. The address is stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wallet {
    /// On-chain address.
    pub address: String,
}

impl Wallet {
    /// Wrap an address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Half-open range of proto ids, `from..to`.
///
/// ```rust
/// use chordjob::pipeline::ProtoRange;
///
/// assert_eq!(ProtoRange::default().len(), 1799);
/// assert!(ProtoRange::new(10, 3).is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoRange {
    /// First proto, inclusive.
    pub from: ProtoId,
    /// Last proto, exclusive.
    pub to: ProtoId,
}

impl ProtoRange {
    /// Create a range; `to <= from` yields an empty range.
    pub fn new(from: ProtoId, to: ProtoId) -> Self {
        Self { from, to }
    }

    /// Fill in missing bounds with `1` and [`PROTO_MAX`].
    pub fn from_bounds(from: Option<ProtoId>, to: Option<ProtoId>) -> Self {
        Self::new(from.unwrap_or(1), to.unwrap_or(PROTO_MAX))
    }

    /// Proto ids in ascending order.
    pub fn iter(&self) -> Range<ProtoId> {
        self.from..self.to.max(self.from)
    }

    /// Number of protos in the range.
    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from) as usize
    }

    /// Returns true if the range holds no protos.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProtoRange {
    fn default() -> Self {
        Self::from_bounds(None, None)
    }
}

impl IntoIterator for ProtoRange {
    type Item = ProtoId;
    type IntoIter = Range<ProtoId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
