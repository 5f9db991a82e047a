
use kurbo::{CubicBez, Point, Rect};

use crate::config::RoutingConfig;
use crate::geometry::{is_degenerate, left_mid, right_mid, to_local};
use crate::ir::{BlockGraph, LinkSide};
use crate::surface::{ElementKey, Measure};

/// Path of one connector in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorPath {
    Straight { start: Point, end: Point },
    Curve(CubicBez),
}

impl ConnectorPath {
    /// Defining points: start and end for a line, start, both controls and
    /// end for a curve.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Self::Straight { start, end } => vec![*start, *end],
            Self::Curve(cubic) => vec![cubic.p0, cubic.p1, cubic.p2, cubic.p3],
        }
    }

    pub fn start(&self) -> Point {
        match self {
            Self::Straight { start, .. } => *start,
            Self::Curve(cubic) => cubic.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Straight { end, .. } => *end,
            Self::Curve(cubic) => cubic.p3,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, Self::Straight { .. })
    }

    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        match self {
            Self::Straight { start, end } => {
                d.push_str(&format!(
                    "M {:.2} {:.2} L {:.2} {:.2}",
                    start.x, start.y, end.x, end.y
                ));
            }
            Self::Curve(c) => {
                d.push_str(&format!(
                    "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
                    c.p0.x, c.p0.y, c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y
                ));
            }
        }
        d
    }
}

/// Route one segment. Near axis-aligned segments stay straight; anything
/// else becomes a cubic that leaves `start` horizontally towards `side` and
/// arrives at `end` travelling rightwards, since `end` is a left edge.
pub fn route_segment(
    start: Point,
    end: Point,
    side: LinkSide,
    config: &RoutingConfig,
) -> ConnectorPath {
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    if dy < config.axis_snap || dx < config.axis_snap {
        return ConnectorPath::Straight { start, end };
    }

    let lead = config.start_handle_min.max(config.start_handle_ratio * dx);
    let tail = config.end_handle_min.max(config.end_handle_ratio * dx);
    ConnectorPath::Curve(CubicBez::new(
        start,
        Point::new(start.x + side.sign() * lead, start.y),
        Point::new(end.x - tail, end.y),
        end,
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub source_block: usize,
    pub row: usize,
    pub target_block: usize,
    pub side: LinkSide,
    pub path: ConnectorPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No block is declared with the link's target id.
    DanglingTarget(String),
    /// The source row has not been realized yet.
    UnmeasuredSource,
    /// Neither the target title nor the target block has a box.
    UnmeasuredTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub source_block: usize,
    pub row: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorSet {
    pub connectors: Vec<Connector>,
    pub skipped: Vec<SkippedLink>,
}

impl ConnectorSet {
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

/// Measure every linked row and its target on `surface` and route one
/// connector per link, in declaration order. Links whose endpoints cannot be
/// measured are reported in [`ConnectorSet::skipped`] and drawn without a
/// connector.
pub fn route_connectors(
    graph: &BlockGraph,
    surface: &impl Measure,
    config: &RoutingConfig,
) -> ConnectorSet {
    let origin = surface.surface_rect().origin();
    let mut set = ConnectorSet::default();

    for (source_block, block) in graph.blocks.iter().enumerate() {
        for (row, link) in block.links() {
            let skip = |reason: SkipReason| SkippedLink {
                source_block,
                row,
                reason,
            };
            let Some(target_block) = graph.position(&link.target) else {
                tracing::debug!(
                    source = %graph.label(source_block),
                    row,
                    target = %link.target,
                    "link target not found; no connector"
                );
                set.skipped
                    .push(skip(SkipReason::DanglingTarget(link.target.clone())));
                continue;
            };
            let Some(row_rect) = measured(surface, ElementKey::Row {
                block: source_block,
                row,
            }) else {
                set.skipped.push(skip(SkipReason::UnmeasuredSource));
                continue;
            };
            let Some(target_rect) = measured(surface, ElementKey::Title(target_block))
                .or_else(|| measured(surface, ElementKey::Block(target_block)))
            else {
                set.skipped.push(skip(SkipReason::UnmeasuredTarget));
                continue;
            };

            let row_rect = to_local(row_rect, origin);
            let start = match link.side {
                LinkSide::Left => left_mid(row_rect),
                LinkSide::Right => right_mid(row_rect),
            };
            let end = left_mid(to_local(target_rect, origin));
            set.connectors.push(Connector {
                source_block,
                row,
                target_block,
                side: link.side,
                path: route_segment(start, end, link.side, config),
            });
        }
    }

    if !set.skipped.is_empty() {
        tracing::debug!(
            routed = set.connectors.len(),
            skipped = set.skipped.len(),
            "connectors routed with skips"
        );
    }
    set
}

fn measured(surface: &impl Measure, key: ElementKey) -> Option<Rect> {
    surface
        .client_rect(key)
        .filter(|rect| !is_degenerate(*rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{Block, Link, Row};
    use crate::layout::{LayoutMode, compute_layout};
    use crate::surface::Surface;
    use crate::theme::Theme;
    use std::collections::HashMap;

    struct FixedBoxes {
        origin: Point,
        boxes: HashMap<ElementKey, Rect>,
    }

    impl Measure for FixedBoxes {
        fn surface_rect(&self) -> Rect {
            Rect::from_origin_size(self.origin, (800.0, 600.0))
        }

        fn client_rect(&self, key: ElementKey) -> Option<Rect> {
            self.boxes.get(&key).copied()
        }
    }

    fn linked_row(target: &str, side: LinkSide) -> Row {
        Row {
            name: Some("next".to_string()),
            link: Some(Link {
                target: target.to_string(),
                side,
            }),
            ..Default::default()
        }
    }

    fn two_blocks(side: LinkSide) -> BlockGraph {
        let mut a = Block::new(Some("A"), "A");
        a.rows.push(linked_row("B", side));
        BlockGraph {
            blocks: vec![a, Block::new(Some("B"), "B")],
        }
    }

    #[test]
    fn curve_arrives_horizontally() {
        let config = RoutingConfig::default();
        let start = Point::new(100.0, 40.0);
        let end = Point::new(300.0, 140.0);
        let ConnectorPath::Curve(cubic) = route_segment(start, end, LinkSide::Right, &config)
        else {
            panic!("expected a curve");
        };
        assert_eq!(cubic.p1, Point::new(160.0, 40.0));
        assert_eq!(cubic.p2, Point::new(270.0, 140.0));
        assert_eq!(cubic.p2.y, end.y);
    }

    #[test]
    fn handle_minimums_apply_on_short_spans() {
        let config = RoutingConfig::default();
        let path = route_segment(
            Point::new(0.0, 0.0),
            Point::new(40.0, 50.0),
            LinkSide::Right,
            &config,
        );
        let points = path.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], Point::new(30.0, 0.0));
        assert_eq!(points[2], Point::new(20.0, 50.0));
    }

    #[test]
    fn near_axis_segments_are_straight() {
        let config = RoutingConfig::default();
        let flat = route_segment(
            Point::new(0.0, 100.0),
            Point::new(400.0, 109.0),
            LinkSide::Right,
            &config,
        );
        assert!(flat.is_straight());
        assert_eq!(flat.points().len(), 2);
        let steep = route_segment(
            Point::new(0.0, 0.0),
            Point::new(9.5, 300.0),
            LinkSide::Right,
            &config,
        );
        assert!(steep.is_straight());
    }

    #[test]
    fn left_side_leaves_leftwards_and_arrives_from_the_left() {
        let config = RoutingConfig::default();
        let ConnectorPath::Curve(cubic) = route_segment(
            Point::new(500.0, 20.0),
            Point::new(100.0, 220.0),
            LinkSide::Left,
            &config,
        ) else {
            panic!("expected a curve");
        };
        assert_eq!(cubic.p1, Point::new(380.0, 20.0));
        assert_eq!(cubic.p2, Point::new(40.0, 220.0));
        assert!(cubic.p3.x - cubic.p2.x > 0.0);
    }

    #[test]
    fn routes_in_surface_local_space_with_title_target() {
        let graph = two_blocks(LinkSide::Right);
        let origin = Point::new(50.0, 20.0);
        let boxes = HashMap::from([
            (
                ElementKey::Row { block: 0, row: 0 },
                Rect::new(60.0, 60.0, 200.0, 80.0),
            ),
            (ElementKey::Title(1), Rect::new(300.0, 200.0, 420.0, 230.0)),
            (ElementKey::Block(1), Rect::new(300.0, 200.0, 420.0, 300.0)),
        ]);
        let set = route_connectors(&graph, &FixedBoxes { origin, boxes }, &RoutingConfig::default());
        assert_eq!(set.len(), 1);
        let path = set.connectors[0].path;
        assert_eq!(path.start(), Point::new(150.0, 50.0));
        assert_eq!(path.end(), Point::new(250.0, 195.0));
    }

    #[test]
    fn falls_back_to_block_box_without_title() {
        let graph = two_blocks(LinkSide::Left);
        let boxes = HashMap::from([
            (
                ElementKey::Row { block: 0, row: 0 },
                Rect::new(100.0, 0.0, 200.0, 20.0),
            ),
            (ElementKey::Block(1), Rect::new(400.0, 100.0, 500.0, 200.0)),
        ]);
        let set = route_connectors(
            &graph,
            &FixedBoxes {
                origin: Point::ZERO,
                boxes,
            },
            &RoutingConfig::default(),
        );
        let connector = &set.connectors[0];
        assert_eq!(connector.path.start(), Point::new(100.0, 10.0));
        assert_eq!(connector.path.end(), Point::new(400.0, 150.0));
        assert_eq!(connector.target_block, 1);
    }

    #[test]
    fn dangling_link_is_skipped() {
        let mut a = Block::new(Some("A"), "A");
        a.rows.push(linked_row("ghost", LinkSide::Right));
        let graph = BlockGraph { blocks: vec![a] };
        let boxes = HashMap::from([(
            ElementKey::Row { block: 0, row: 0 },
            Rect::new(0.0, 0.0, 100.0, 20.0),
        )]);
        let set = route_connectors(
            &graph,
            &FixedBoxes {
                origin: Point::ZERO,
                boxes,
            },
            &RoutingConfig::default(),
        );
        assert!(set.is_empty());
        assert_eq!(
            set.skipped,
            vec![SkippedLink {
                source_block: 0,
                row: 0,
                reason: SkipReason::DanglingTarget("ghost".to_string()),
            }]
        );
    }

    #[test]
    fn unmounted_surface_routes_nothing() {
        let graph = two_blocks(LinkSide::Right);
        let surface = Surface::new("s", Point::new(10.0, 10.0), 640.0);
        let set = route_connectors(&graph, &surface, &RoutingConfig::default());
        assert!(set.is_empty());
        assert_eq!(set.skipped[0].reason, SkipReason::UnmeasuredSource);
    }

    #[test]
    fn mounted_surface_connects_row_to_next_column() {
        let graph = two_blocks(LinkSide::Right);
        let layout = compute_layout(&graph, LayoutMode::Hierarchical).unwrap();
        let mut surface = Surface::new("s", Point::new(30.0, 40.0), 0.0);
        let layout_config = LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        };
        surface.mount(&graph, &layout, &Theme::notes(), &layout_config);
        let set = route_connectors(&graph, &surface, &RoutingConfig::default());
        assert_eq!(set.len(), 1);
        let row = surface
            .local_rect(ElementKey::Row { block: 0, row: 0 })
            .unwrap();
        let title = surface.local_rect(ElementKey::Title(1)).unwrap();
        let path = set.connectors[0].path;
        assert_eq!(path.start(), right_mid(row));
        assert_eq!(path.end(), left_mid(title));
    }

    #[test]
    fn svg_path_data() {
        let line = ConnectorPath::Straight {
            start: Point::new(0.0, 1.0),
            end: Point::new(2.5, 1.0),
        };
        assert_eq!(line.to_svg_path(), "M 0.00 1.00 L 2.50 1.00");
    }
}
