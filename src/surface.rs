//! Realization of a [`StructureLayout`] onto a rendering surface.
//!
//! The layout engine only decides which column each block belongs to. A
//! [`Surface`] turns that into concrete boxes for every block, title, header
//! and row. Those boxes only exist once the surface is mounted; measuring an
//! unmounted surface yields zero-sized boxes, the same way measuring an
//! element that was never laid out does.

use std::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::config::LayoutConfig;
use crate::ir::{Block, BlockGraph, HeaderKind};
use crate::layout::{Flow, StructureLayout, TextBlock, measure_text};
use crate::theme::Theme;

/// Identifies a realized element on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKey {
    Surface,
    Column(usize),
    Block(usize),
    Title(usize),
    Header(usize),
    Row { block: usize, row: usize },
}

/// Read access to realized geometry in client coordinates.
pub trait Measure {
    /// Client rect of the surface itself; connector coordinates are
    /// expressed relative to its top-left corner.
    fn surface_rect(&self) -> Rect;

    /// Client rect of `key`, or `None` if no such element exists.
    fn client_rect(&self, key: ElementKey) -> Option<Rect>;
}

#[derive(Debug, Clone)]
pub struct CellBox {
    pub kind: HeaderKind,
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct RowBox {
    pub rect: Rect,
    pub cells: Vec<CellBox>,
    pub linked: bool,
}

/// Geometry of one block, relative to the surface content origin.
#[derive(Debug, Clone)]
pub struct BlockBox {
    pub index: usize,
    pub rect: Rect,
    pub title_rect: Rect,
    pub title: TextBlock,
    pub header: Option<RowBox>,
    pub rows: Vec<RowBox>,
    /// Visible region of a scrollable block; rows outside it are clipped but
    /// keep their natural geometry.
    pub clip: Option<Rect>,
}

#[derive(Debug, Clone)]
struct Realized {
    blocks: Vec<Option<BlockBox>>,
    columns: Vec<Rect>,
    content_size: Size,
    padding: f64,
    cell_padding: f64,
}

type ReadyCallback = Box<dyn FnOnce(&Surface)>;

pub struct Surface {
    key: String,
    origin: Point,
    available_width: f64,
    realized: Option<Realized>,
    ready: Vec<ReadyCallback>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("key", &self.key)
            .field("origin", &self.origin)
            .field("available_width", &self.available_width)
            .field("mounted", &self.realized.is_some())
            .field("pending_ready", &self.ready.len())
            .finish()
    }
}

impl Surface {
    /// An empty, unmounted surface whose top-left sits at `origin` in client
    /// space and which may grow to `available_width`.
    pub fn new(key: impl Into<String>, origin: Point, available_width: f64) -> Self {
        Self {
            key: key.into(),
            origin,
            available_width: available_width.max(0.0),
            realized: None,
            ready: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn is_mounted(&self) -> bool {
        self.realized.is_some()
    }

    /// Queue a one-shot callback that runs right after the next mount, once
    /// every element has its final box.
    pub fn on_ready(&mut self, callback: impl FnOnce(&Surface) + 'static) {
        self.ready.push(Box::new(callback));
    }

    /// Realize `layout` on this surface, replacing previous content, then
    /// flush the ready callbacks.
    pub fn mount(
        &mut self,
        graph: &BlockGraph,
        layout: &StructureLayout,
        theme: &Theme,
        config: &LayoutConfig,
    ) {
        self.realized = Some(realize(graph, layout, theme, config));
        tracing::debug!(surface = %self.key, size = ?self.size(), "surface mounted");
        for callback in std::mem::take(&mut self.ready) {
            callback(self);
        }
    }

    pub fn unmount(&mut self) {
        self.realized = None;
    }

    /// New host width. Content is re-centred; element sizes are unchanged.
    pub fn resize(&mut self, available_width: f64) {
        self.available_width = available_width.max(0.0);
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    /// A mounted copy of this surface under a new key and origin. Pending
    /// ready callbacks stay with the original.
    pub fn duplicate(&self, key: impl Into<String>, origin: Point) -> Self {
        Self {
            key: key.into(),
            origin,
            available_width: self.available_width,
            realized: self.realized.clone(),
            ready: Vec::new(),
        }
    }

    /// Size of the realized content including padding (zero when unmounted).
    pub fn content_size(&self) -> Size {
        match &self.realized {
            Some(realized) => Size::new(
                realized.content_size.width + realized.padding * 2.0,
                realized.content_size.height + realized.padding * 2.0,
            ),
            None => Size::ZERO,
        }
    }

    /// Size of the surface: the host width or the content, whichever is wider.
    pub fn size(&self) -> Size {
        let content = self.content_size();
        if self.realized.is_none() {
            return Size::ZERO;
        }
        Size::new(content.width.max(self.available_width), content.height)
    }

    pub fn block_box(&self, block: usize) -> Option<&BlockBox> {
        self.realized.as_ref()?.blocks.get(block)?.as_ref()
    }

    pub fn block_boxes(&self) -> impl Iterator<Item = &BlockBox> {
        self.realized
            .iter()
            .flat_map(|realized| realized.blocks.iter().flatten())
    }

    pub fn column_rects(&self) -> Vec<Rect> {
        let offset = self.content_offset();
        self.realized
            .as_ref()
            .map(|realized| realized.columns.iter().map(|rect| *rect + offset).collect())
            .unwrap_or_default()
    }

    /// Offset from surface top-left to content origin; horizontally centred
    /// when the host is wider than the content.
    pub fn content_offset(&self) -> Vec2 {
        let Some(realized) = &self.realized else {
            return Vec2::ZERO;
        };
        let outer = realized.content_size.width + realized.padding * 2.0;
        let spare = (self.available_width - outer).max(0.0);
        Vec2::new(realized.padding + spare / 2.0, realized.padding)
    }

    /// Horizontal inset of cell text inside its cell.
    pub fn cell_padding(&self) -> f64 {
        self.realized
            .as_ref()
            .map(|realized| realized.cell_padding)
            .unwrap_or_default()
    }

    /// Rect of `key` relative to the surface top-left.
    pub fn local_rect(&self, key: ElementKey) -> Option<Rect> {
        let realized = self.realized.as_ref()?;
        let offset = self.content_offset();
        let rect = match key {
            ElementKey::Surface => return Some(Rect::from_origin_size(Point::ZERO, self.size())),
            ElementKey::Column(idx) => *realized.columns.get(idx)?,
            ElementKey::Block(idx) => self.block_box(idx)?.rect,
            ElementKey::Title(idx) => self.block_box(idx)?.title_rect,
            ElementKey::Header(idx) => self.block_box(idx)?.header.as_ref()?.rect,
            ElementKey::Row { block, row } => self.block_box(block)?.rows.get(row)?.rect,
        };
        Some(rect + offset)
    }
}

impl Measure for Surface {
    fn surface_rect(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size())
    }

    fn client_rect(&self, key: ElementKey) -> Option<Rect> {
        if self.realized.is_none() {
            return Some(Rect::from_origin_size(self.origin, Size::ZERO));
        }
        self.local_rect(key).map(|rect| rect + self.origin.to_vec2())
    }
}

fn realize(
    graph: &BlockGraph,
    layout: &StructureLayout,
    theme: &Theme,
    config: &LayoutConfig,
) -> Realized {
    let mut blocks: Vec<Option<BlockBox>> = vec![None; graph.blocks.len()];
    let mut columns = Vec::with_capacity(layout.columns.len());
    let mut extent = Size::ZERO;

    match layout.flow() {
        Flow::Vertical => {
            let mut x = 0.0;
            for column in &layout.columns {
                let mut y = 0.0;
                let mut width: f64 = 0.0;
                for &index in &column.blocks {
                    let Some(block) = graph.blocks.get(index) else {
                        continue;
                    };
                    let placed = realize_block(index, block, Point::new(x, y), theme, config);
                    width = width.max(placed.rect.width());
                    y = placed.rect.y1 + config.block_gap;
                    blocks[index] = Some(placed);
                }
                let height = if column.blocks.is_empty() {
                    0.0
                } else {
                    y - config.block_gap
                };
                columns.push(Rect::new(x, 0.0, x + width, height));
                extent.width = extent.width.max(x + width);
                extent.height = extent.height.max(height);
                x += width + config.column_gap;
            }
        }
        Flow::Horizontal => {
            let mut x = 0.0;
            let mut height: f64 = 0.0;
            for column in &layout.columns {
                let start = x;
                for &index in &column.blocks {
                    let Some(block) = graph.blocks.get(index) else {
                        continue;
                    };
                    let placed = realize_block(index, block, Point::new(x, 0.0), theme, config);
                    height = height.max(placed.rect.height());
                    x = placed.rect.x1 + config.column_gap;
                    blocks[index] = Some(placed);
                }
                let end = if column.blocks.is_empty() {
                    start
                } else {
                    x - config.column_gap
                };
                columns.push(Rect::new(start, 0.0, end, height));
                extent.width = extent.width.max(end);
            }
            extent.height = height;
        }
    }

    Realized {
        blocks,
        columns,
        content_size: extent,
        padding: config.surface_padding,
        cell_padding: config.cell_padding_x,
    }
}

fn realize_block(
    index: usize,
    block: &Block,
    origin: Point,
    theme: &Theme,
    config: &LayoutConfig,
) -> BlockBox {
    let family = theme.font_family.as_str();
    let cell_pad = config.cell_padding_x;
    let row_height = theme.font_size * config.label_line_height + config.row_padding_y * 2.0;

    let kinds: Vec<HeaderKind> = [HeaderKind::Offset, HeaderKind::Content, HeaderKind::Size]
        .into_iter()
        .filter(|kind| block.has_column(*kind))
        .collect();

    let row_texts: Vec<Vec<String>> = block
        .rows
        .iter()
        .map(|row| {
            kinds
                .iter()
                .map(|kind| match kind {
                    HeaderKind::Offset => row.offset.clone().unwrap_or_default(),
                    HeaderKind::Content => row.content_text().unwrap_or_default(),
                    HeaderKind::Size => row.size.clone().unwrap_or_default(),
                })
                .collect()
        })
        .collect();
    let header_texts: Option<Vec<String>> = if block.visible_headers().is_empty() {
        None
    } else {
        Some(
            kinds
                .iter()
                .map(|kind| {
                    block
                        .header_for(*kind)
                        .map(|header| header.text.clone())
                        .unwrap_or_default()
                })
                .collect(),
        )
    };

    let measure = |text: &str| measure_text(text, theme.font_size, family, 0, config).width;
    let mut widths: Vec<f64> = kinds.iter().map(|_| cell_pad * 2.0).collect();
    for texts in row_texts.iter().chain(header_texts.iter()) {
        for (slot, text) in texts.iter().enumerate() {
            widths[slot] = widths[slot].max(measure(text) + cell_pad * 2.0);
        }
    }

    let title = measure_text(
        &block.title,
        theme.title_font_size,
        family,
        config.max_title_width_chars,
        config,
    );
    let inner: f64 = widths.iter().sum();
    let width = config
        .min_block_width
        .max(inner)
        .max(title.width + cell_pad * 2.0);
    if width > inner {
        let grow = kinds
            .iter()
            .position(|kind| *kind == HeaderKind::Content)
            .or(kinds.len().checked_sub(1));
        if let Some(slot) = grow {
            widths[slot] += width - inner;
        }
    }

    let title_height = title.height + config.title_padding_y * 2.0;
    let title_rect = Rect::new(origin.x, origin.y, origin.x + width, origin.y + title_height);
    let mut y = title_rect.y1;

    let layout_row = |texts: &[String], top: f64| -> (Rect, Vec<CellBox>) {
        let rect = Rect::new(origin.x, top, origin.x + width, top + row_height);
        let mut x = origin.x;
        let cells = kinds
            .iter()
            .zip(texts)
            .zip(&widths)
            .map(|((kind, text), w)| {
                let cell = CellBox {
                    kind: *kind,
                    text: text.clone(),
                    rect: Rect::new(x, top, x + w, top + row_height),
                };
                x += w;
                cell
            })
            .collect();
        (rect, cells)
    };

    let header = header_texts.as_ref().map(|texts| {
        let (rect, cells) = layout_row(texts, y);
        y = rect.y1;
        RowBox {
            rect,
            cells,
            linked: false,
        }
    });

    let mut rows = Vec::with_capacity(block.rows.len());
    for (row, texts) in block.rows.iter().zip(&row_texts) {
        let (rect, cells) = layout_row(texts, y);
        y = rect.y1;
        rows.push(RowBox {
            rect,
            cells,
            linked: row.link.is_some(),
        });
    }

    let natural = Rect::new(origin.x, origin.y, origin.x + width, y);
    let (rect, clip) = if block.scrollable && natural.height() > config.scroll_max_height {
        let clipped = Rect::new(
            natural.x0,
            natural.y0,
            natural.x1,
            natural.y0 + config.scroll_max_height,
        );
        (clipped, Some(clipped))
    } else {
        (natural, None)
    };

    BlockBox {
        index,
        rect,
        title_rect,
        title,
        header,
        rows,
        clip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColumnHeader, Link, LinkSide, Row};
    use crate::layout::{LayoutMode, compute_layout};
    use std::cell::Cell;
    use std::rc::Rc;

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        }
    }

    fn field(name: &str, link: Option<&str>) -> Row {
        Row {
            name: Some(name.to_string()),
            ty: Some("u32".to_string()),
            link: link.map(|target| Link {
                target: target.to_string(),
                side: LinkSide::Right,
            }),
            ..Default::default()
        }
    }

    fn sample() -> BlockGraph {
        let mut a = Block::new(Some("A"), "Header");
        a.rows.push(field("magic", None));
        a.rows.push(field("body", Some("B")));
        let mut b = Block::new(Some("B"), "Body");
        b.rows.push(field("len", None));
        BlockGraph { blocks: vec![a, b] }
    }

    fn mounted(mode: LayoutMode) -> (BlockGraph, Surface) {
        let graph = sample();
        let layout = compute_layout(&graph, mode).unwrap();
        let mut surface = Surface::new("s", Point::new(100.0, 50.0), 0.0);
        surface.mount(&graph, &layout, &Theme::notes(), &config());
        (graph, surface)
    }

    #[test]
    fn unmounted_surface_measures_degenerate_boxes() {
        let surface = Surface::new("s", Point::new(10.0, 10.0), 800.0);
        let rect = surface.client_rect(ElementKey::Block(0)).unwrap();
        assert_eq!(rect.size(), Size::ZERO);
        assert_eq!(surface.size(), Size::ZERO);
    }

    #[test]
    fn hierarchical_columns_are_left_to_right() {
        let (_, surface) = mounted(LayoutMode::Hierarchical);
        let a = surface.local_rect(ElementKey::Block(0)).unwrap();
        let b = surface.local_rect(ElementKey::Block(1)).unwrap();
        assert!(b.x0 >= a.x1 + config().column_gap - 1e-9);
        assert_eq!(a.y0, b.y0);
    }

    #[test]
    fn column_mode_stacks_vertically() {
        let (_, surface) = mounted(LayoutMode::Column);
        let a = surface.local_rect(ElementKey::Block(0)).unwrap();
        let b = surface.local_rect(ElementKey::Block(1)).unwrap();
        assert_eq!(a.x0, b.x0);
        assert!(b.y0 >= a.y1);
    }

    #[test]
    fn rows_sit_below_title_inside_block() {
        let (_, surface) = mounted(LayoutMode::Hierarchical);
        let block = surface.local_rect(ElementKey::Block(0)).unwrap();
        let title = surface.local_rect(ElementKey::Title(0)).unwrap();
        let row0 = surface.local_rect(ElementKey::Row { block: 0, row: 0 }).unwrap();
        let row1 = surface.local_rect(ElementKey::Row { block: 0, row: 1 }).unwrap();
        assert_eq!(title.y0, block.y0);
        assert_eq!(row0.y0, title.y1);
        assert_eq!(row1.y0, row0.y1);
        assert_eq!(row1.y1, block.y1);
        assert!(surface.block_box(0).unwrap().rows[1].linked);
    }

    #[test]
    fn client_rects_include_surface_origin() {
        let (_, surface) = mounted(LayoutMode::Hierarchical);
        let local = surface.local_rect(ElementKey::Title(1)).unwrap();
        let client = surface.client_rect(ElementKey::Title(1)).unwrap();
        assert_eq!(client.origin(), local.origin() + Vec2::new(100.0, 50.0));
        assert!(surface.client_rect(ElementKey::Block(7)).is_none());
    }

    #[test]
    fn resize_recenters_content() {
        let (_, mut surface) = mounted(LayoutMode::Hierarchical);
        let before = surface.local_rect(ElementKey::Block(0)).unwrap();
        let wide = surface.content_size().width + 200.0;
        surface.resize(wide);
        let after = surface.local_rect(ElementKey::Block(0)).unwrap();
        assert!((after.x0 - before.x0 - 100.0).abs() < 1e-9);
        assert_eq!(surface.size().width, wide);
    }

    #[test]
    fn ready_callbacks_fire_once_after_mount() {
        let graph = sample();
        let layout = compute_layout(&graph, LayoutMode::Hierarchical).unwrap();
        let mut surface = Surface::new("s", Point::ZERO, 0.0);
        let fired = Rc::new(Cell::new(0));
        let seen = fired.clone();
        surface.on_ready(move |surface| {
            assert!(surface.is_mounted());
            seen.set(seen.get() + 1);
        });
        assert_eq!(fired.get(), 0);
        surface.mount(&graph, &layout, &Theme::notes(), &config());
        surface.mount(&graph, &layout, &Theme::notes(), &config());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn scrollable_block_is_clipped_but_rows_keep_geometry() {
        let mut block = Block::new(Some("long"), "Long");
        block.scrollable = true;
        for i in 0..40 {
            block.rows.push(field(&format!("f{i}"), None));
        }
        let graph = BlockGraph { blocks: vec![block] };
        let layout = compute_layout(&graph, LayoutMode::Flat).unwrap();
        let mut surface = Surface::new("s", Point::ZERO, 0.0);
        let cfg = config();
        surface.mount(&graph, &layout, &Theme::notes(), &cfg);
        let rect = surface.local_rect(ElementKey::Block(0)).unwrap();
        assert!((rect.height() - cfg.scroll_max_height).abs() < 1e-9);
        let last = surface.local_rect(ElementKey::Row { block: 0, row: 39 }).unwrap();
        assert!(last.y1 > rect.y1);
        assert!(surface.block_box(0).unwrap().clip.is_some());
    }

    #[test]
    fn header_row_only_for_columns_with_data() {
        let mut block = Block::new(Some("h"), "Hdr");
        block.headers = vec![ColumnHeader {
            kind: HeaderKind::Offset,
            text: "Offset".to_string(),
        }];
        block.rows.push(field("x", None));
        let graph = BlockGraph { blocks: vec![block.clone()] };
        let layout = compute_layout(&graph, LayoutMode::Flat).unwrap();
        let mut surface = Surface::new("s", Point::ZERO, 0.0);
        surface.mount(&graph, &layout, &Theme::notes(), &config());
        assert!(surface.block_box(0).unwrap().header.is_none());

        block.rows[0].offset = Some("0x0".to_string());
        let graph = BlockGraph { blocks: vec![block] };
        surface.mount(&graph, &layout, &Theme::notes(), &config());
        let header = surface.block_box(0).unwrap().header.as_ref().unwrap();
        assert_eq!(header.cells.len(), 2);
        assert_eq!(header.cells[0].text, "Offset");
        assert_eq!(header.cells[1].text, "");
    }

    #[test]
    fn content_column_absorbs_extra_width() {
        let (_, surface) = mounted(LayoutMode::Flat);
        let block = surface.block_box(0).unwrap();
        let row = &block.rows[0];
        let last = row.cells.last().unwrap();
        assert!((last.rect.x1 - block.rect.x1).abs() < 1e-9);
        assert!(block.rect.width() >= config().min_block_width);
    }
}
