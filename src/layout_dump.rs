use crate::ir::{BlockGraph, LinkSide};
use crate::layout::StructureLayout;
use crate::routing::{ConnectorSet, SkipReason};
use crate::surface::{ElementKey, Surface};
use kurbo::Rect;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub mode: String,
    pub width: f64,
    pub height: f64,
    pub columns: Vec<ColumnDump>,
    pub blocks: Vec<BlockDump>,
    pub connectors: Vec<ConnectorDump>,
    pub skipped: Vec<SkippedDump>,
}

#[derive(Debug, Serialize)]
pub struct ColumnDump {
    pub level: usize,
    pub blocks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockDump {
    pub index: usize,
    pub id: Option<String>,
    pub title_lines: Vec<String>,
    pub level: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub clipped: bool,
    pub rows: Vec<RowDump>,
}

#[derive(Debug, Serialize)]
pub struct RowDump {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub cells: Vec<String>,
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub from: String,
    pub row: usize,
    pub to: String,
    pub side: String,
    pub curved: bool,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Serialize)]
pub struct SkippedDump {
    pub from: String,
    pub row: usize,
    pub reason: String,
}

impl LayoutDump {
    pub fn from_parts(
        graph: &BlockGraph,
        layout: &StructureLayout,
        surface: &Surface,
        connectors: &ConnectorSet,
    ) -> Self {
        let columns = layout
            .columns
            .iter()
            .map(|column| ColumnDump {
                level: column.level,
                blocks: column.blocks.iter().map(|idx| graph.label(*idx)).collect(),
            })
            .collect();

        let blocks = surface
            .block_boxes()
            .map(|placed| {
                let rect = surface
                    .local_rect(ElementKey::Block(placed.index))
                    .unwrap_or(Rect::ZERO);
                let source = graph.blocks.get(placed.index);
                let rows = placed
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(row, row_box)| {
                        let rect = surface
                            .local_rect(ElementKey::Row {
                                block: placed.index,
                                row,
                            })
                            .unwrap_or(Rect::ZERO);
                        RowDump {
                            x: rect.x0,
                            y: rect.y0,
                            width: rect.width(),
                            height: rect.height(),
                            cells: row_box.cells.iter().map(|cell| cell.text.clone()).collect(),
                            link: source
                                .and_then(|block| block.rows.get(row))
                                .and_then(|row| row.link.as_ref())
                                .map(|link| link.target.clone()),
                        }
                    })
                    .collect();
                BlockDump {
                    index: placed.index,
                    id: source.and_then(|block| block.id.clone()),
                    title_lines: placed.title.lines.clone(),
                    level: layout.level_of(placed.index),
                    x: rect.x0,
                    y: rect.y0,
                    width: rect.width(),
                    height: rect.height(),
                    clipped: placed.clip.is_some(),
                    rows,
                }
            })
            .collect();

        let connector_dumps = connectors
            .connectors
            .iter()
            .map(|connector| ConnectorDump {
                from: graph.label(connector.source_block),
                row: connector.row,
                to: graph.label(connector.target_block),
                side: match connector.side {
                    LinkSide::Left => "left".to_string(),
                    LinkSide::Right => "right".to_string(),
                },
                curved: !connector.path.is_straight(),
                points: connector
                    .path
                    .points()
                    .iter()
                    .map(|point| [point.x, point.y])
                    .collect(),
            })
            .collect();

        let skipped = connectors
            .skipped
            .iter()
            .map(|skip| SkippedDump {
                from: graph.label(skip.source_block),
                row: skip.row,
                reason: match &skip.reason {
                    SkipReason::DanglingTarget(target) => format!("dangling target `{target}`"),
                    SkipReason::UnmeasuredSource => "source row not measured".to_string(),
                    SkipReason::UnmeasuredTarget => "target not measured".to_string(),
                },
            })
            .collect();

        let size = surface.size();
        LayoutDump {
            mode: layout.mode.as_str().to_string(),
            width: size.width,
            height: size.height,
            columns,
            blocks,
            connectors: connector_dumps,
            skipped,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    graph: &BlockGraph,
    layout: &StructureLayout,
    surface: &Surface,
    connectors: &ConnectorSet,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_parts(graph, layout, surface, connectors);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
