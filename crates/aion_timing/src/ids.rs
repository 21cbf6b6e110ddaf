//! Opaque ID newtypes for timing graph and constraint-store entities.
//!
//! All IDs are thin `u32` wrappers used as arena indices. They are `Copy`,
//! `Hash`, and `Serialize`/`Deserialize` so they can be embedded in the
//! persisted graph and constraint types without extra bookkeeping.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the raw index as a `usize` for arena indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a node (`tnode`) in the timing graph.
    TimingNodeId
);

define_id!(
    /// Opaque, copyable ID for an edge (`tedge`) in the timing graph.
    TimingEdgeId
);

define_id!(
    /// Index of a clock within the constraint store's clock list.
    ClockIndex
);
