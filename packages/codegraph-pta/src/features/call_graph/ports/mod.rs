//! Ports for call graph consumers
//!
//! Name-level view of a call graph: contexts are projected away and the
//! synthetic root and unknown nodes are omitted.

/// Procedure-level call graph queried by qualified name (`Type.selector`)
pub trait CallGraphProvider {
    /// Procedures `func_name` may call, sorted.
    /// Empty if the procedure makes no resolved calls or is unreachable.
    fn get_callees(&self, func_name: &str) -> Vec<String>;

    /// All reachable procedures, sorted
    fn get_functions(&self) -> Vec<String>;

    /// Procedures that may call `func_name` (reverse call graph).
    /// Default implementation scans every function.
    fn get_callers(&self, func_name: &str) -> Vec<String> {
        self.get_functions()
            .into_iter()
            .filter(|caller| self.get_callees(caller).iter().any(|c| c == func_name))
            .collect()
    }

    /// Check if call graph contains function
    fn contains_function(&self, func_name: &str) -> bool {
        self.get_functions().iter().any(|f| f == func_name)
    }

    /// Get number of functions in graph
    fn num_functions(&self) -> usize {
        self.get_functions().len()
    }
}
