//! Textual and JSON dumps of a pointer analysis
//!
//! Every node, object and location is written under its stable name (see
//! [`PointerAnalysis::node_name`]), and every list is sorted, so two runs
//! over the same input produce identical dumps regardless of worklist order.
//!
//! Text format, one fact per line:
//! ```text
//! status complete
//! node Main.main()[]
//! edge <fake-root>[] 0 Main.main()[]
//! pts Main.main()[]:v1 -> A@p0#new0[]
//! ```

use crate::errors::Result;
use crate::features::points_to::application::PointerAnalysis;
use crate::features::points_to::infrastructure::{AnalysisStatus, IncompleteReason};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    pub method: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub caller: String,
    pub site: u32,
    pub callee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointsToEntry {
    pub location: String,
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDump {
    pub status: AnalysisStatus,
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<EdgeEntry>,
    /// Non-empty points-to sets only
    pub points_to: Vec<PointsToEntry>,
}

impl AnalysisDump {
    pub fn from_analysis(analysis: &PointerAnalysis) -> Self {
        let call_graph = analysis.call_graph();

        let mut nodes: Vec<NodeEntry> = call_graph
            .nodes()
            .map(|node| NodeEntry {
                name: analysis.node_name(node.id),
                method: analysis.method_name(node.method),
                context: node.context.to_string(),
            })
            .collect();
        nodes.sort();

        let mut edges: Vec<EdgeEntry> = call_graph
            .edges()
            .into_iter()
            .map(|(caller, site, callee)| EdgeEntry {
                caller: analysis.node_name(caller),
                site,
                callee: analysis.node_name(callee),
            })
            .collect();
        edges.sort();

        let mut points_to: Vec<PointsToEntry> = analysis
            .locations()
            .filter_map(|(location, _)| {
                let set = analysis.points_to(location);
                if set.is_empty() {
                    return None;
                }
                let mut objects: Vec<String> =
                    set.into_iter().map(|o| analysis.instance_name(o)).collect();
                objects.sort();
                Some(PointsToEntry {
                    location: analysis.location_name(location),
                    objects,
                })
            })
            .collect();
        points_to.sort();

        Self {
            status: analysis.status(),
            nodes,
            edges,
            points_to,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let status = match self.status {
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Incomplete(IncompleteReason::Cancelled) => "incomplete cancelled",
        };
        // writing into a String cannot fail
        let _ = writeln!(out, "status {}", status);
        for node in &self.nodes {
            let _ = writeln!(out, "node {}", node.name);
        }
        for edge in &self.edges {
            let _ = writeln!(out, "edge {} {} {}", edge.caller, edge.site, edge.callee);
        }
        for entry in &self.points_to {
            let _ = writeln!(out, "pts {} -> {}", entry.location, entry.objects.join(", "));
        }
        out
    }
}
