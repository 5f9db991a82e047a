use crate::config::RenderConfig;
use crate::ir::{BlockGraph, HeaderKind};
use crate::routing::ConnectorSet;
use crate::surface::{BlockBox, RowBox, Surface};
use crate::theme::Theme;
use anyhow::Result;
use kurbo::{Rect, Size, Vec2};
use std::path::Path;

/// Id of the marker every connector ends with.
pub const ARROWHEAD_ID: &str = "arrowhead";

/// Serialize a mounted surface and its connectors to SVG. Coordinates are
/// surface-local, which is the space connectors are routed in.
pub fn render_svg(
    graph: &BlockGraph,
    surface: &Surface,
    connectors: &ConnectorSet,
    theme: &Theme,
) -> String {
    let size = surface.size();
    let width = size.width.max(1.0);
    let height = size.height.max(1.0);
    let offset = surface.content_offset();
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"table-structure-diagram\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">"
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"{ARROWHEAD_ID}\" markerWidth=\"6\" markerHeight=\"6\" refX=\"3\" refY=\"3\" orient=\"auto\"><polygon points=\"0 0, 6 3, 0 6\" fill=\"{}\"/></marker>",
        theme.link_color
    ));
    for block in surface.block_boxes() {
        if let Some(clip) = block.clip {
            let clip = clip + offset;
            svg.push_str(&format!(
                "<clipPath id=\"clip-block-{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"/></clipPath>",
                block.index,
                clip.x0,
                clip.y0,
                clip.width(),
                clip.height()
            ));
        }
    }
    svg.push_str("</defs>");

    if let Some(fill) = theme.column_background.as_deref() {
        for column in surface.column_rects() {
            let column = column.inflate(8.0, 8.0);
            svg.push_str(&format!(
                "<rect class=\"structure-column\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{fill}\"/>",
                column.x0,
                column.y0,
                column.width(),
                column.height()
            ));
        }
    }

    let inset = surface.cell_padding();
    for block in surface.block_boxes() {
        let id = graph
            .blocks
            .get(block.index)
            .and_then(|b| b.id.as_deref())
            .unwrap_or_default();
        render_block(&mut svg, block, id, offset, inset, theme);
    }

    for connector in &connectors.connectors {
        svg.push_str(&format!(
            "<path class=\"table-link-path\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#{ARROWHEAD_ID})\"/>",
            connector.path.to_svg_path(),
            theme.link_color,
            theme.link_width
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn render_block(svg: &mut String, block: &BlockBox, id: &str, offset: Vec2, inset: f64, theme: &Theme) {
    let rect = block.rect + offset;
    svg.push_str(&format!(
        "<g class=\"structure-block\" data-block-id=\"{}\">",
        escape_xml(id)
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        rect.x0,
        rect.y0,
        rect.width(),
        rect.height(),
        theme.block_fill,
        theme.block_border
    ));

    if block.clip.is_some() {
        svg.push_str(&format!("<g clip-path=\"url(#clip-block-{})\">", block.index));
    }

    let title = block.title_rect + offset;
    svg.push_str(&format!(
        "<rect class=\"structure-title\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
        title.x0,
        title.y0,
        title.width(),
        title.height(),
        theme.title_fill
    ));
    let line_height = if block.title.lines.is_empty() {
        0.0
    } else {
        block.title.height / block.title.lines.len() as f64
    };
    let center_x = title.x0 + title.width() / 2.0;
    let first_y = title.y0 + (title.height() - block.title.height) / 2.0 + line_height / 2.0;
    svg.push_str(&format!(
        "<text x=\"{center_x:.2}\" y=\"{first_y:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.title_font_size,
        theme.title_text_color
    ));
    for (idx, line) in block.title.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        svg.push_str(&format!(
            "<tspan x=\"{center_x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    svg.push_str("</text>");

    if let Some(header) = &block.header {
        render_row(svg, header, offset, inset, theme, true);
    }
    for row in &block.rows {
        render_row(svg, row, offset, inset, theme, false);
    }

    if block.clip.is_some() {
        svg.push_str("</g>");
    }
    svg.push_str("</g>");
}

fn render_row(
    svg: &mut String,
    row: &RowBox,
    offset: Vec2,
    inset: f64,
    theme: &Theme,
    header: bool,
) {
    let rect: Rect = row.rect + offset;
    let fill = if header {
        Some(theme.header_fill.as_str())
    } else {
        row.linked.then_some(theme.link_row_fill.as_str())
    };
    if let Some(fill) = fill {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{fill}\"/>",
            rect.x0,
            rect.y0,
            rect.width(),
            rect.height()
        ));
    }
    svg.push_str(&format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        rect.x0, rect.y0, rect.x1, rect.y0, theme.row_divider
    ));

    for cell in &row.cells {
        if cell.text.is_empty() {
            continue;
        }
        let cell_rect = cell.rect + offset;
        let color = if header {
            theme.header_text_color.as_str()
        } else {
            match cell.kind {
                HeaderKind::Offset => theme.offset_text_color.as_str(),
                HeaderKind::Size => theme.size_text_color.as_str(),
                HeaderKind::Content => theme.row_text_color.as_str(),
            }
        };
        let (x, anchor) = match cell.kind {
            HeaderKind::Content => (cell_rect.x0 + inset, "start"),
            HeaderKind::Offset | HeaderKind::Size => (cell_rect.x0 + cell_rect.width() / 2.0, "middle"),
        };
        let y = cell_rect.y0 + cell_rect.height() / 2.0;
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{color}\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size,
            escape_xml(&cell.text)
        ));
    }
}

/// Wrap an already rendered diagram in a scaled frame whose extent is the
/// natural size times `scale`, the way the zoom overlay presents it.
pub fn render_zoomed_svg(svg: &str, natural: Size, scale: f64) -> String {
    let width = natural.width * scale;
    let height = natural.height * scale;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\"><g transform=\"scale({scale})\" style=\"transform-origin: 0 0\">{svg}</g></svg>"
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "monospace".to_string());
    if let Some(size) = usvg::Size::from_wh(render_cfg.width as f32, render_cfg.height as f32) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, RoutingConfig};
    use crate::ir::{Block, Link, LinkSide, Row};
    use crate::layout::{LayoutMode, compute_layout};
    use crate::routing::route_connectors;
    use kurbo::Point;

    fn rendered(scrollable: bool) -> String {
        let mut a = Block::new(Some("A"), "Header <v1>");
        a.scrollable = scrollable;
        a.rows.push(Row {
            offset: Some("0x00".to_string()),
            name: Some("next".to_string()),
            ty: Some("u32".to_string()),
            link: Some(Link {
                target: "B".to_string(),
                side: LinkSide::Right,
            }),
            ..Default::default()
        });
        let mut b = Block::new(Some("B"), "Body");
        b.rows.push(Row {
            name: Some("payload".to_string()),
            size: Some("n".to_string()),
            ..Default::default()
        });
        let graph = BlockGraph { blocks: vec![a, b] };
        let layout = compute_layout(&graph, LayoutMode::Hierarchical).unwrap();
        let config = LayoutConfig {
            fast_text_metrics: true,
            scroll_max_height: 40.0,
            ..Default::default()
        };
        let theme = Theme::notes();
        let mut surface = Surface::new("s", Point::ZERO, 0.0);
        surface.mount(&graph, &layout, &theme, &config);
        let connectors = route_connectors(&graph, &surface, &RoutingConfig::default());
        render_svg(&graph, &surface, &connectors, &theme)
    }

    #[test]
    fn renders_blocks_rows_and_connector() {
        let svg = rendered(false);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Header &lt;v1&gt;"));
        assert!(svg.contains("u32 next"));
        assert!(svg.contains("0x00"));
        assert!(svg.contains("class=\"table-link-path\""));
        assert!(svg.contains("marker-end=\"url(#arrowhead)\""));
        assert!(svg.contains("points=\"0 0, 6 3, 0 6\""));
        assert!(svg.contains("data-block-id=\"B\""));
        assert!(!svg.contains("clip-path"));
    }

    #[test]
    fn scrollable_blocks_are_clipped() {
        let svg = rendered(true);
        assert!(svg.contains("<clipPath id=\"clip-block-0\">"));
        assert!(svg.contains("clip-path=\"url(#clip-block-0)\""));
    }

    #[test]
    fn zoomed_frame_scales_natural_size() {
        let framed = render_zoomed_svg("<svg/>", Size::new(100.0, 50.0), 2.0);
        assert!(framed.contains("width=\"200.00\""));
        assert!(framed.contains("height=\"100.00\""));
        assert!(framed.contains("transform=\"scale(2)\""));
    }

    #[test]
    fn escape_xml_covers_markup() {
        assert_eq!(escape_xml("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
    }
}
