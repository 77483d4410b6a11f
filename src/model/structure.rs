//! Local crystal structure labels assigned per atom by template matching.

use serde::{Deserialize, Serialize};

/// Number of distinct structure labels.
pub const NUM_STRUCTURE_TYPES: usize = 8;

/// Local structure type of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum StructureType {
    #[default]
    Other = 0,
    Fcc = 1,
    Hcp = 2,
    Bcc = 3,
    Sc = 4,
    CubicDiamond = 5,
    HexDiamond = 6,
    Graphene = 7,
}

impl StructureType {
    pub const ALL: [StructureType; NUM_STRUCTURE_TYPES] = [
        StructureType::Other,
        StructureType::Fcc,
        StructureType::Hcp,
        StructureType::Bcc,
        StructureType::Sc,
        StructureType::CubicDiamond,
        StructureType::HexDiamond,
        StructureType::Graphene,
    ];

    /// Dense index, usable for per-type count tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_crystalline(self) -> bool {
        self != StructureType::Other
    }

    /// Structures whose orientation is expressed in a cubic frame.
    pub fn is_cubic(self) -> bool {
        matches!(
            self,
            StructureType::Sc | StructureType::Fcc | StructureType::Bcc | StructureType::CubicDiamond
        )
    }

    /// Structures whose orientation is expressed in a hexagonal frame.
    pub fn is_hexagonal(self) -> bool {
        matches!(
            self,
            StructureType::Hcp | StructureType::HexDiamond | StructureType::Graphene
        )
    }

    /// Number of template neighbors that define the structure.
    ///
    /// Diamond structures include the second shell (4 + 12), graphene
    /// likewise (3 + 6). `Other` has no template and returns 0.
    pub fn num_neighbors(self) -> usize {
        match self {
            StructureType::Other => 0,
            StructureType::Sc => 6,
            StructureType::Fcc | StructureType::Hcp => 12,
            StructureType::Bcc => 14,
            StructureType::CubicDiamond | StructureType::HexDiamond => 16,
            StructureType::Graphene => 9,
        }
    }

    /// The phase a coherent-interface partner belongs to, if any.
    ///
    /// FCC pairs with HCP, cubic diamond with hexagonal diamond.
    pub fn interface_partner(self) -> Option<StructureType> {
        match self {
            StructureType::Fcc => Some(StructureType::Hcp),
            StructureType::Hcp => Some(StructureType::Fcc),
            StructureType::CubicDiamond => Some(StructureType::HexDiamond),
            StructureType::HexDiamond => Some(StructureType::CubicDiamond),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StructureType::Other => "Other",
            StructureType::Fcc => "FCC",
            StructureType::Hcp => "HCP",
            StructureType::Bcc => "BCC",
            StructureType::Sc => "SC",
            StructureType::CubicDiamond => "Cubic diamond",
            StructureType::HexDiamond => "Hexagonal diamond",
            StructureType::Graphene => "Graphene",
        }
    }
}

impl std::fmt::Display for StructureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for (i, s) in StructureType::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_interface_partners_are_symmetric() {
        for s in StructureType::ALL {
            if let Some(p) = s.interface_partner() {
                assert_eq!(p.interface_partner(), Some(s));
                assert_ne!(s.is_cubic(), p.is_cubic());
            }
        }
    }

    #[test]
    fn test_frames_are_exclusive() {
        for s in StructureType::ALL {
            assert!(!(s.is_cubic() && s.is_hexagonal()));
            assert_eq!(s.is_crystalline(), s.is_cubic() || s.is_hexagonal());
        }
    }
}
