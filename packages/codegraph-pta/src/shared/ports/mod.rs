//! Ports to the front-end layer

pub mod class_hierarchy;

pub use class_hierarchy::{is_primitive, ClassHierarchy, SimpleClassHierarchy, ROOT_TYPE};
