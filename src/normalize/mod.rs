//! Tree normalization (C2): turns the external enumerator's JSON tree into a
//! canonical [`DependencyMap`](crate::core::DependencyMap).

mod tree;

pub use tree::build_dependency_map;
