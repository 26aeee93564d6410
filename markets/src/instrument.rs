//! Core instrument abstractions.
//!
//! An [`Instrument`] is a shared handle to an [`InstrumentData`] record. Identity is by
//! handle, not by value: two [`Instrument`]s are equal iff they point at the same
//! allocation (`Arc::ptr_eq`), matching the "two handles are equal iff they point to the
//! same instance" rule instruments are created under.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Weak};

use crate::exchange::ExchangeId;

/// Instrument type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Spot,
    LinearContract,
    InverseContract,
    QuantumContract,
    Cfd,
}

impl Display for InstrumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstrumentKind::Spot => "spot",
            InstrumentKind::LinearContract => "linear-contract",
            InstrumentKind::InverseContract => "inverse-contract",
            InstrumentKind::QuantumContract => "quantum-contract",
            InstrumentKind::Cfd => "cfd",
        };
        write!(f, "{s}")
    }
}

/// Backing record for an [`Instrument`] handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentData {
    pub id: String,
    pub label: String,
    pub kind: InstrumentKind,
    pub exchange: ExchangeId,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub lot_multiplier: Decimal,
    pub min_size: Decimal,
    pub min_notional: Decimal,
    pub quantum_factor: Decimal,
    pub tradable: bool,
    pub can_short: bool,
}

impl InstrumentData {
    pub fn is_inverse(&self) -> bool {
        matches!(self.kind, InstrumentKind::InverseContract)
    }
}

/// Shared handle to an [`InstrumentData`] record. Cheap to clone; equality and hashing are
/// by pointer identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument(Arc<InstrumentData>);

impl Instrument {
    pub fn new(data: InstrumentData) -> Self {
        Self(Arc::new(data))
    }

    pub fn data(&self) -> &InstrumentData {
        &self.0
    }

    pub fn downgrade(&self) -> Weak<InstrumentData> {
        Arc::downgrade(&self.0)
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl std::ops::Deref for Instrument {
    type Target = InstrumentData;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.id)
    }
}

/// Lazily-creating, weakly-referencing registry of [`Instrument`] handles keyed by stable
/// id. Strategies and the Exchange mediator share handles through this table rather than
/// constructing `Instrument`s directly, so two lookups of the same id return equal handles.
///
/// A `HashMap<String, Weak<T>>` plus a periodic [`InstrumentRegistry::gc`] sweep, in place
/// of the source's RTTI-backed shared ownership.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    entries: HashMap<String, Weak<InstrumentData>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live handle for `id` if one exists.
    pub fn get(&self, id: &str) -> Option<Instrument> {
        self.entries.get(id).and_then(Weak::upgrade).map(Instrument)
    }

    /// Returns the live handle for `id`, creating one from `make` if none exists or the
    /// previous one was reclaimed.
    pub fn get_or_create(
        &mut self,
        id: &str,
        make: impl FnOnce() -> InstrumentData,
    ) -> Instrument {
        if let Some(existing) = self.get(id) {
            return existing;
        }
        let data = Arc::new(make());
        self.entries.insert(id.to_string(), Arc::downgrade(&data));
        Instrument(data)
    }

    /// Drops entries whose handle has no remaining strong reference anywhere.
    pub fn gc(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lightweight instrument reference used by market-data-only call sites that do not need
/// the full [`Instrument`] handle (e.g. stream subscriptions keyed before an `Instrument`
/// has been interned).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketDataInstrument {
    pub symbol: String,
    pub kind: InstrumentKind,
}

impl MarketDataInstrument {
    pub fn new(symbol: String, kind: InstrumentKind) -> Self {
        Self { symbol, kind }
    }
}

impl<S> From<(S, S, InstrumentKind)> for MarketDataInstrument
where
    S: Into<String>,
{
    fn from((base, _quote, kind): (S, S, InstrumentKind)) -> Self {
        Self {
            symbol: base.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> InstrumentData {
        InstrumentData {
            id: id.to_string(),
            label: id.to_string(),
            kind: InstrumentKind::Spot,
            exchange: ExchangeId::Mock,
            tick_size: Decimal::new(1, 2),
            lot_size: Decimal::ONE,
            lot_multiplier: Decimal::ONE,
            min_size: Decimal::ONE,
            min_notional: Decimal::ZERO,
            quantum_factor: Decimal::ONE,
            tradable: true,
            can_short: true,
        }
    }

    #[test]
    fn handles_to_same_id_are_equal() {
        let mut reg = InstrumentRegistry::new();
        let a = reg.get_or_create("AAA", || sample("AAA"));
        let b = reg.get_or_create("AAA", || sample("AAA"));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_instances_with_same_data_are_not_equal() {
        let a = Instrument::new(sample("AAA"));
        let b = Instrument::new(sample("AAA"));
        assert_ne!(a, b);
    }

    #[test]
    fn gc_reclaims_entries_with_no_strong_refs() {
        let mut reg = InstrumentRegistry::new();
        {
            let _a = reg.get_or_create("AAA", || sample("AAA"));
        }
        assert_eq!(reg.len(), 1);
        reg.gc();
        assert!(reg.is_empty());
    }
}
