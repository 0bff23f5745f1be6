//! # Depth Labelling
//!
//! Labels each AST node with its generation in the tree so generated nodes
//! can be laid out in columns. Purely cosmetic.

use crate::parser::{Expr, ExprId, ExpressionVisitor, VisitPhase};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DepthLabeler {
    /// Node depths in the order the nodes completed
    chart: Vec<(ExprId, usize)>,
    current_depth: usize,
    maximum_depth: usize,
}

impl DepthLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(root: &Expr) -> DepthChart {
        let mut labeler = Self::new();
        root.accept(&mut labeler);
        labeler.into_chart()
    }

    pub fn into_chart(self) -> DepthChart {
        DepthChart::new(self.chart, self.maximum_depth)
    }
}

impl ExpressionVisitor for DepthLabeler {
    fn visit(&mut self, node: &Expr, phase: VisitPhase) {
        match phase {
            VisitPhase::Pre => {
                self.current_depth += 1;
                self.maximum_depth = self.maximum_depth.max(self.current_depth);
            }
            VisitPhase::Post => {
                // Interior nodes sit one level above their children
                self.current_depth -= 1;
                self.chart.push((node.id, self.current_depth));
            }
            VisitPhase::Leaf => {
                self.chart.push((node.id, self.current_depth));
            }
        }
    }
}

/// Depth of every node plus its row within that depth
#[derive(Debug, Clone, Default)]
pub struct DepthChart {
    depths: HashMap<ExprId, usize>,
    rows: HashMap<ExprId, usize>,
    /// Number of nodes at each depth
    heights: HashMap<usize, usize>,
    maximum_depth: usize,
}

impl DepthChart {
    fn new(chart: Vec<(ExprId, usize)>, maximum_depth: usize) -> Self {
        let mut result = Self {
            maximum_depth,
            ..Self::default()
        };

        for (id, depth) in chart {
            let height = result.heights.entry(depth).or_insert(0);
            result.rows.insert(id, *height);
            *height += 1;
            result.depths.insert(id, depth);
        }

        result
    }

    pub fn depth_of(&self, id: ExprId) -> usize {
        self.depths.get(&id).copied().unwrap_or(0)
    }

    pub fn row_of(&self, id: ExprId) -> usize {
        self.rows.get(&id).copied().unwrap_or(0)
    }

    pub fn height_at(&self, depth: usize) -> usize {
        self.heights.get(&depth).copied().unwrap_or(0)
    }

    pub fn maximum_depth(&self) -> usize {
        self.maximum_depth
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}
