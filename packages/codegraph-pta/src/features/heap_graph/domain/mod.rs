//! Heap graph domain

pub mod heap_graph;

pub use heap_graph::{HeapGraph, HeapNode};
