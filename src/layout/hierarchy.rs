use std::collections::HashMap;

use crate::ir::BlockGraph;

use super::LayoutError;

/// Parent/level assignment inferred from the links of a block graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    parents: Vec<Option<usize>>,
    levels: Vec<usize>,
}

impl Hierarchy {
    pub fn parent(&self, block: usize) -> Option<usize> {
        self.parents.get(block).copied().flatten()
    }

    pub fn level(&self, block: usize) -> usize {
        self.levels.get(block).copied().unwrap_or(0)
    }

    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn is_root(&self, block: usize) -> bool {
        self.parent(block).is_none()
    }

    pub fn max_level(&self) -> usize {
        self.levels.iter().copied().max().unwrap_or(0)
    }
}

/// Infer `parent[target] = source` from every link (first writer wins, in
/// declaration order) and assign each block its depth below the roots.
///
/// Links to unknown ids take no part in the hierarchy. A row linking to its
/// own block is ignored here as well, since it would make the block its own
/// parent. Any longer loop is reported as [`LayoutError::CyclicHierarchy`].
pub fn derive_hierarchy(graph: &BlockGraph) -> Result<Hierarchy, LayoutError> {
    let count = graph.blocks.len();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (idx, block) in graph.blocks.iter().enumerate() {
        if let Some(id) = block.id.as_deref() {
            index.entry(id).or_insert(idx);
        }
    }

    let mut parents: Vec<Option<usize>> = vec![None; count];
    for (source, block) in graph.blocks.iter().enumerate() {
        for (row, link) in block.links() {
            let Some(&target) = index.get(link.target.as_str()) else {
                tracing::debug!(
                    source = %graph.label(source),
                    row,
                    target = %link.target,
                    "dangling link ignored for hierarchy"
                );
                continue;
            };
            if target == source {
                tracing::debug!(block = %graph.label(source), row, "self link ignored for hierarchy");
                continue;
            }
            if parents[target].is_none() {
                parents[target] = Some(source);
            }
        }
    }

    let levels = assign_levels(graph, &parents)?;
    Ok(Hierarchy { parents, levels })
}

/// Memoized walk up the parent chain. `on_path` marks the blocks of the walk
/// in progress so a loop is caught the moment it closes.
fn assign_levels(graph: &BlockGraph, parents: &[Option<usize>]) -> Result<Vec<usize>, LayoutError> {
    let count = parents.len();
    let mut levels: Vec<Option<usize>> = vec![None; count];
    let mut on_path = vec![false; count];

    for start in 0..count {
        if levels[start].is_some() {
            continue;
        }
        let mut path: Vec<usize> = Vec::new();
        let mut cursor = start;
        let base = loop {
            if let Some(level) = levels[cursor] {
                break Some(level);
            }
            if on_path[cursor] {
                let loop_start = path.iter().position(|idx| *idx == cursor).unwrap_or(0);
                let mut chain: Vec<String> =
                    path[loop_start..].iter().map(|idx| graph.label(*idx)).collect();
                chain.push(graph.label(cursor));
                // Walking up from a child visits parents; report in link direction.
                chain.reverse();
                return Err(LayoutError::CyclicHierarchy { chain });
            }
            on_path[cursor] = true;
            path.push(cursor);
            match parents[cursor] {
                Some(parent) => cursor = parent,
                None => break None,
            }
        };

        // `path` runs child -> ... -> topmost; the topmost is either a root
        // (level 0) or sits one below an already resolved block.
        let mut level = match base {
            Some(resolved) => resolved + 1,
            None => 0,
        };
        for idx in path.iter().rev() {
            levels[*idx] = Some(level);
            on_path[*idx] = false;
            level += 1;
        }
    }

    Ok(levels.into_iter().map(|level| level.unwrap_or(0)).collect())
}
