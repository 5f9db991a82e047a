use serde::{Deserialize, Serialize};

use super::Hierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// One column per hierarchy level, roots on the left.
    #[default]
    Hierarchical,
    /// Every block stacked in a single column, declaration order.
    Column,
    /// Every block side by side in a single row, declaration order.
    Flat,
}

impl LayoutMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "hierarchical" => Some(Self::Hierarchical),
            "column" | "auto" => Some(Self::Column),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Column => "column",
            Self::Flat => "flat",
        }
    }
}

/// Direction in which a column stacks its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub level: usize,
    /// Block indices in declaration order.
    pub blocks: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct StructureLayout {
    pub mode: LayoutMode,
    pub columns: Vec<Column>,
    /// Only computed for [`LayoutMode::Hierarchical`].
    pub hierarchy: Option<Hierarchy>,
}

impl StructureLayout {
    /// How blocks inside each column are stacked.
    pub fn flow(&self) -> Flow {
        match self.mode {
            LayoutMode::Flat => Flow::Horizontal,
            LayoutMode::Hierarchical | LayoutMode::Column => Flow::Vertical,
        }
    }

    /// Every placed block, column by column.
    pub fn blocks_in_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().flat_map(|column| column.blocks.iter().copied())
    }

    pub fn level_of(&self, block: usize) -> Option<usize> {
        self.hierarchy.as_ref().map(|h| h.level(block))
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f64,
    pub height: f64,
}
