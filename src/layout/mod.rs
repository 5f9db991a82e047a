mod error;
mod hierarchy;
mod text;
pub(crate) mod types;
pub use error::LayoutError;
pub use hierarchy::{Hierarchy, derive_hierarchy};
pub use text::measure_text;
pub use types::*;

use crate::ir::BlockGraph;

/// Group the blocks of `graph` into columns according to `mode`.
///
/// Hierarchical mode emits one column per level from 0 to the deepest level
/// seen, each holding its blocks in declaration order. The other modes keep
/// declaration order in a single column; they never look at links, so they
/// accept graphs whose links loop.
pub fn compute_layout(graph: &BlockGraph, mode: LayoutMode) -> Result<StructureLayout, LayoutError> {
    match mode {
        LayoutMode::Hierarchical => {
            let hierarchy = derive_hierarchy(graph)?;
            let columns = columns_by_level(graph, &hierarchy);
            tracing::debug!(
                blocks = graph.blocks.len(),
                columns = columns.len(),
                "hierarchical layout"
            );
            Ok(StructureLayout {
                mode,
                columns,
                hierarchy: Some(hierarchy),
            })
        }
        LayoutMode::Column | LayoutMode::Flat => Ok(StructureLayout {
            mode,
            columns: vec![Column {
                level: 0,
                blocks: (0..graph.blocks.len()).collect(),
            }],
            hierarchy: None,
        }),
    }
}

fn columns_by_level(graph: &BlockGraph, hierarchy: &Hierarchy) -> Vec<Column> {
    if graph.blocks.is_empty() {
        return Vec::new();
    }
    let mut columns: Vec<Column> = (0..=hierarchy.max_level())
        .map(|level| Column {
            level,
            blocks: Vec::new(),
        })
        .collect();
    for block in 0..graph.blocks.len() {
        columns[hierarchy.level(block)].blocks.push(block);
    }
    columns
}
