//! Fixed adjacency tables used for neighbor expansion.
use bevy::math::IVec2;

/// Cardinal offsets in the fixed expansion order: west, east, south, north.
pub const CARDINAL_OFFSETS: [IVec2; 4] = [
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
];

/// Ordinal offsets, row-major with the center skipped.
pub const ORDINAL_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

/// Which cells count as adjacent when expanding a neighbor query.
///
/// The offset tables have a fixed iteration order so tie-broken search
/// outcomes are reproducible for identical grid state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Adjacency {
    /// 4-connected: the cardinal neighbors only.
    #[default]
    Cardinal,
    /// 8-connected: cardinals plus diagonals.
    Ordinal,
}

impl Adjacency {
    /// The offsets expanded for this adjacency, in expansion order.
    pub fn offsets(self) -> &'static [IVec2] {
        match self {
            Adjacency::Cardinal => &CARDINAL_OFFSETS,
            Adjacency::Ordinal => &ORDINAL_OFFSETS,
        }
    }

    pub fn is_ordinal(self) -> bool {
        matches!(self, Adjacency::Ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_offsets_are_unit_steps() {
        for offset in Adjacency::Cardinal.offsets() {
            assert_eq!(offset.x.abs() + offset.y.abs(), 1);
        }
    }

    #[test]
    fn ordinal_offsets_skip_the_center() {
        assert_eq!(Adjacency::Ordinal.offsets().len(), 8);
        assert!(!Adjacency::Ordinal.offsets().contains(&IVec2::ZERO));
    }
}
