//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure analysis vocabulary (no strategy choices)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - Algorithms and strategy implementations

pub mod call_graph;
pub mod dump;
pub mod heap_graph;
pub mod points_to;
