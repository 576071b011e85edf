use serde::{Deserialize, Serialize};

/// State of a single lattice site.
///
/// `Necrotic` is absorbing: once a site reaches it, no rule moves it out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellState {
    #[default]
    Healthy = 0,
    Tumor = 1,
    Necrotic = 2,
}

impl CellState {
    /// All states, in code order.
    pub const ALL: [CellState; 3] = [CellState::Healthy, CellState::Tumor, CellState::Necrotic];

    /// Stable numeric code used in snapshots (0 healthy, 1 tumor, 2 necrotic).
    #[inline(always)]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CellState::Healthy),
            1 => Some(CellState::Tumor),
            2 => Some(CellState::Necrotic),
            _ => None,
        }
    }

    /// Tumor or necrotic tissue, i.e. what counts towards local density.
    #[inline(always)]
    pub fn is_tumor_mass(self) -> bool {
        matches!(self, CellState::Tumor | CellState::Necrotic)
    }

    #[inline(always)]
    pub fn is_absorbing(self) -> bool {
        self == CellState::Necrotic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        for state in CellState::ALL {
            assert_eq!(CellState::from_code(state.code()), Some(state));
        }
        assert_eq!(CellState::Tumor.code(), 1);
        assert_eq!(CellState::from_code(3), None);
    }

    #[test]
    fn tumor_mass_excludes_healthy() {
        assert!(!CellState::Healthy.is_tumor_mass());
        assert!(CellState::Tumor.is_tumor_mass());
        assert!(CellState::Necrotic.is_tumor_mass());
        assert!(CellState::Necrotic.is_absorbing());
    }
}
