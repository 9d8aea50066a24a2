use serde::{Deserialize, Serialize};

/// Packed 64-bit feature identifier: `(space_id:16 || part_id:48)`
pub type FeatureId = u64;

/// Feature namespace identifier (upper 16 bits of a feature id)
pub type SpaceId = u16;

/// Reserved id for failed feature-id computations
pub const INVALID_FEATURE_ID: FeatureId = 0;

/// Bits of a feature id taken by the in-space part
pub const PART_ID_BITS: u32 = 48;

/// Mask selecting the in-space part of a feature id
pub const PART_ID_MASK: u64 = (1 << PART_ID_BITS) - 1;

/// How a feature space encodes keys into the 48-bit part id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    /// Keys are decimal unsigned integers, used directly as the part id
    Integer,
    /// Keys are arbitrary strings, hashed into 48 bits
    String,
}

/// A feature namespace with a stable key→id encoding.
///
/// Space ids are nonzero so that every valid feature id is nonzero.
#[derive(Clone, Debug)]
pub struct FeatureSpace {
    name: String,
    id: SpaceId,
    feature_type: FeatureType,
}

impl FeatureSpace {
    pub fn new(name: impl Into<String>, id: SpaceId, feature_type: FeatureType) -> Self {
        debug_assert!(id != 0, "space id 0 is reserved");
        Self {
            name: name.into(),
            id,
            feature_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Compute the packed feature id for a key in this space.
    ///
    /// Returns [`INVALID_FEATURE_ID`] when an `Integer` key does not parse.
    pub fn calculate_feature_id(&self, key: &str) -> FeatureId {
        let part = match self.feature_type {
            FeatureType::Integer => match key.parse::<u64>() {
                Ok(value) => value & PART_ID_MASK,
                Err(_) => return INVALID_FEATURE_ID,
            },
            FeatureType::String => {
                // Hash collisions with the reserved id are remapped.
                let hashed = fnv1a64(key.as_bytes()) & PART_ID_MASK;
                if hashed == 0 {
                    1
                } else {
                    hashed
                }
            }
        };
        ((self.id as u64) << PART_ID_BITS) | part
    }

    /// Extract the space id from a packed feature id
    pub fn space_of(id: FeatureId) -> SpaceId {
        (id >> PART_ID_BITS) as SpaceId
    }

    /// Extract the in-space part from a packed feature id
    pub fn part_of(id: FeatureId) -> u64 {
        id & PART_ID_MASK
    }
}

/// FNV-1a, truncated by callers to the 48-bit part-id width
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_space_packs_parsed_value() {
        let space = FeatureSpace::new("category", 1, FeatureType::Integer);
        let id = space.calculate_feature_id("111");
        assert_eq!(FeatureSpace::space_of(id), 1);
        assert_eq!(FeatureSpace::part_of(id), 111);
    }

    #[test]
    fn test_integer_space_rejects_bad_key() {
        let space = FeatureSpace::new("category", 1, FeatureType::Integer);
        assert_eq!(space.calculate_feature_id("xxx"), INVALID_FEATURE_ID);
        assert_eq!(space.calculate_feature_id(""), INVALID_FEATURE_ID);
        assert_eq!(space.calculate_feature_id("-3"), INVALID_FEATURE_ID);
    }

    #[test]
    fn test_string_space_is_stable_and_nonzero() {
        let space = FeatureSpace::new("keyword", 2, FeatureType::String);
        let a = space.calculate_feature_id("xxx");
        let b = space.calculate_feature_id("xxx");
        assert_eq!(a, b);
        assert_ne!(a, INVALID_FEATURE_ID);
        assert_eq!(FeatureSpace::space_of(a), 2);
        assert_ne!(FeatureSpace::part_of(a), 0);
    }

    #[test]
    fn test_space_id_occupies_high_bits() {
        let space = FeatureSpace::new("max", u16::MAX, FeatureType::Integer);
        let id = space.calculate_feature_id("1");
        assert_eq!(FeatureSpace::space_of(id), u16::MAX);
        assert_eq!(FeatureSpace::part_of(id), 1);
    }

    #[test]
    fn test_oversized_integer_key_is_masked() {
        let space = FeatureSpace::new("category", 1, FeatureType::Integer);
        let id = space.calculate_feature_id(&u64::MAX.to_string());
        assert_eq!(FeatureSpace::space_of(id), 1);
        assert_eq!(FeatureSpace::part_of(id), PART_ID_MASK);
    }
}
