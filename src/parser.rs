use crate::ir::{Block, BlockGraph, ColumnHeader, HeaderKind, Link, LinkSide, Row};
use crate::layout::LayoutMode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static FENCE_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<fence>`{3,}|~{3,})\s*(?:table-)?structure(?:\s|$)").expect("fence regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("diagram input is empty")]
    Empty,

    #[error("invalid diagram document: {message}")]
    Syntax { message: String },

    #[error("block {index} has an empty id")]
    EmptyId { index: usize },
}

#[derive(Debug, Clone)]
pub struct ParsedDiagram {
    pub graph: BlockGraph,
    /// Layout mode requested by the document itself, if any.
    pub layout: Option<LayoutMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramDocument {
    #[serde(default)]
    blocks: Vec<BlockData>,
    layout: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockData {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    rows: Vec<RowData>,
    #[serde(default)]
    scrollable: bool,
    #[serde(default)]
    headers: Vec<HeaderData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowData {
    name: Option<String>,
    #[serde(rename = "type")]
    ty: Option<String>,
    desc: Option<String>,
    offset: Option<String>,
    size: Option<String>,
    link_to: Option<String>,
    link_from: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeaderData {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    text: String,
}

/// Parse a block-graph document. Strict JSON is tried first; notes written
/// by hand frequently use JSON5 (comments, unquoted keys, trailing commas),
/// which is accepted as a fallback.
pub fn parse_diagram(input: &str) -> Result<ParsedDiagram, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let document: DiagramDocument = match serde_json::from_str(trimmed) {
        Ok(doc) => doc,
        Err(json_err) => json5::from_str(trimmed).map_err(|json5_err| ParseError::Syntax {
            message: format!("{json_err} (json5: {json5_err})"),
        })?,
    };

    let layout = document.layout.as_deref().and_then(|token| {
        let mode = LayoutMode::from_token(token);
        if mode.is_none() {
            tracing::warn!(layout = token, "unknown layout mode in document; ignoring");
        }
        mode
    });

    let mut graph = BlockGraph::new();
    for (index, data) in document.blocks.into_iter().enumerate() {
        if matches!(data.id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(ParseError::EmptyId { index });
        }
        if let Some(id) = data.id.as_deref()
            && graph.position(id).is_some()
        {
            tracing::warn!(id, index, "duplicate block id; links resolve to the first declaration");
        }
        graph.push(convert_block(data));
    }

    Ok(ParsedDiagram { graph, layout })
}

fn convert_block(data: BlockData) -> Block {
    let headers = data
        .headers
        .into_iter()
        .filter_map(|header| {
            let token = header.kind.as_deref().unwrap_or("content");
            match HeaderKind::from_token(token) {
                Some(kind) => Some(ColumnHeader {
                    kind,
                    text: header.text,
                }),
                None => {
                    tracing::warn!(header = token, "unknown header type; dropping header");
                    None
                }
            }
        })
        .collect();

    Block {
        id: data.id,
        title: data.title,
        rows: data.rows.into_iter().map(convert_row).collect(),
        scrollable: data.scrollable,
        headers,
    }
}

fn convert_row(data: RowData) -> Row {
    let link = data
        .link_to
        .filter(|target| !target.trim().is_empty())
        .map(|target| {
            let side = match data.link_from.as_deref() {
                None => LinkSide::Right,
                Some(token) => LinkSide::from_token(token).unwrap_or_else(|| {
                    tracing::warn!(link_from = token, "unknown link side; using right");
                    LinkSide::Right
                }),
            };
            Link { target, side }
        });
    Row {
        name: data.name,
        ty: data.ty,
        desc: data.desc,
        offset: data.offset,
        size: data.size,
        link,
    }
}

/// Pull every fenced `structure` (or `table-structure`) block out of a
/// Markdown note.
pub fn extract_structure_blocks(input: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut fence: Option<String> = None;
    let mut current: Vec<&str> = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim();
        match fence.as_deref() {
            None => {
                if let Some(caps) = FENCE_OPEN_RE.captures(trimmed) {
                    fence = Some(caps["fence"].to_string());
                    current.clear();
                }
            }
            Some(open) => {
                if is_fence_end(trimmed, open) {
                    blocks.push(current.join("\n"));
                    current.clear();
                    fence = None;
                } else {
                    current.push(line);
                }
            }
        }
    }

    blocks
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    let Some(marker) = fence.chars().next() else {
        return false;
    };
    let run = line.chars().take_while(|ch| *ch == marker).count();
    run >= fence.len() && line[run..].trim().is_empty()
}
