use std::collections::BTreeMap;

use crate::foundation::error::{FlipError, FlipResult};

/// Parity of a region identity: how many color inversions lie on its path, mod 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Parity {
    /// Reached through an even number of transform hops.
    Even,
    /// Reached through an odd number of transform hops.
    Odd,
}

impl Parity {
    /// The other parity.
    pub fn flipped(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }

    /// Parity after `hops` transform hops starting from even.
    pub fn from_hops(hops: u32) -> Self {
        if hops % 2 == 0 { Self::Even } else { Self::Odd }
    }

    fn bit(self) -> u32 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// Identity tag of a contiguous raster region. The low bit is the [`Parity`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Marks pixels no region covers.
    pub const SENTINEL: Self = Self(u32::MAX);

    /// `true` for [`RegionId::SENTINEL`].
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    /// Parity encoded in the low bit.
    pub fn parity(self) -> Parity {
        if self.0 & 1 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

/// Mapping produced by [`IdentityAllocator::reassign`]; one entry per distinct source id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reassignment {
    map: BTreeMap<RegionId, RegionId>,
}

impl Reassignment {
    /// New id for `source`; the sentinel maps to itself, unknown ids map to the sentinel.
    pub fn get(&self, source: RegionId) -> RegionId {
        if source.is_sentinel() {
            return RegionId::SENTINEL;
        }
        self.map.get(&source).copied().unwrap_or(RegionId::SENTINEL)
    }

    /// Number of distinct source ids mapped.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when nothing was mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Monotonic identity counter, owned by one evaluator (never shared between render passes).
///
/// The counter advances by 2 per allocation and the parity occupies the low bit, so ids are
/// unique across both parities.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityAllocator {
    next: u32,
}

impl IdentityAllocator {
    /// Fresh allocator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next / 2
    }

    /// Allocate one id with the requested parity.
    pub fn allocate(&mut self, parity: Parity) -> FlipResult<RegionId> {
        let id = self.next | parity.bit();
        let advanced = self.next.checked_add(2).filter(|n| *n < u32::MAX - 1);
        let Some(advanced) = advanced else {
            return Err(FlipError::evaluation("region identity space exhausted"));
        };
        self.next = advanced;
        Ok(RegionId(id))
    }

    /// Map every distinct id in `sources` to exactly one new id, flipping parity when asked.
    ///
    /// Distinct ids are allocated in ascending order so the result only depends on the set of
    /// sources and the allocator state. Sentinels are skipped.
    pub fn reassign(
        &mut self,
        sources: impl IntoIterator<Item = RegionId>,
        flip_parity: bool,
    ) -> FlipResult<Reassignment> {
        let mut map: BTreeMap<RegionId, RegionId> = sources
            .into_iter()
            .filter(|id| !id.is_sentinel())
            .map(|id| (id, RegionId::SENTINEL))
            .collect();
        for (source, target) in map.iter_mut() {
            let parity = if flip_parity {
                source.parity().flipped()
            } else {
                source.parity()
            };
            *target = self.allocate(parity)?;
        }
        Ok(Reassignment { map })
    }

    /// Restart from zero. Only valid together with dropping every id handed out so far.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/identity/allocator.rs"]
mod tests;
