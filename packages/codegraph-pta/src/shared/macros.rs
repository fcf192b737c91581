//! Shared macros for the codebase
//!
//! Provides the dense-index newtype used by every interning table
//! (procedures, values, call-graph nodes, locations, objects).

/// Declare a `u32`-backed index newtype.
///
/// The generated type is `Copy`, totally ordered, hashable and
/// serializes as a bare integer.
#[macro_export]
macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Index into the owning table
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Build from a table index
            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}
