//! Type-safe identifier wrappers around plain integers.
//!
//! Every entity in the store has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. Unlike UUID-keyed systems, all
//! IDs here are small dense integers because they are fixed by the
//! persisted schema and by the renderer's matrix file layout: sensors are
//! row indices, grids are insertion-ordered, and source/state pairs live
//! in a flat block-partitioned `u64` space.

use serde::{Deserialize, Serialize};

/// Size of one source's contiguous block in the global-id space.
///
/// A new source claims the next unused block boundary above the highest
/// id currently in use; each additional state of that source claims the
/// next sequential id inside the block. Id `0` is always
/// `("sky", "default")`.
pub const BASE_BLOCK: u64 = 1_000_000;

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Flattened identifier for a unique (source, state) pair.
    ///
    /// Allocated by the source registry; decode it through the registry's
    /// reverse map, never by dividing by [`BASE_BLOCK`] -- block starts are
    /// only dense from zero when allocation is source-complete, which the
    /// registry does not promise.
    GlobalId(u64)
}

define_id! {
    /// Index of a sensor within its grid (0-based, dense).
    SensorId(u32)
}

define_id! {
    /// Identifier for a sensor grid, unique within one store.
    GridId(u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_id_round_trips_through_inner() {
        let id = GlobalId::from(2_000_001);
        assert_eq!(id.into_inner(), 2_000_001);
        assert_eq!(u64::from(id), 2_000_001);
    }

    #[test]
    fn ids_order_by_value() {
        assert!(GlobalId(0) < GlobalId(BASE_BLOCK));
        assert!(SensorId(3) > SensorId(2));
    }

    #[test]
    fn display_shows_plain_integer() {
        assert_eq!(GridId(7).to_string(), "7");
    }
}
