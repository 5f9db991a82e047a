//! Interactive scale/pan controller for a realized diagram.
//!
//! A [`ViewportController`] couples two collaborators: the element that
//! receives the scale transform ([`ScaleTarget`], transform origin at its
//! top-left) and the scrollable box around it ([`ScrollViewport`]). Wheel,
//! single-pointer drag and two-finger pinch are folded into one model:
//!
//! - wheel steps the scale by a fixed amount per event and keeps the content
//!   point under the pointer fixed;
//! - drag moves the scroll offset against the pointer motion;
//! - pinch rescales by the finger distance ratio and keeps the content point
//!   under the finger centroid fixed.
//!
//! ```
//! use kurbo::{Point, Size};
//! use structure_rs_renderer::config::ViewportConfig;
//! use structure_rs_renderer::viewport::{ScaledContent, ScrollArea, ViewportController, ViewportEvent};
//!
//! let content = ScaledContent::new(Size::new(400.0, 300.0));
//! let area = ScrollArea::new(Point::ZERO, Size::new(200.0, 200.0));
//! let mut controller = ViewportController::attach(content, area, ViewportConfig::default());
//! assert_eq!(controller.scale(), 1.5);
//!
//! controller.handle(&ViewportEvent::Wheel { position: Point::new(50.0, 50.0), delta_y: 120.0 });
//! assert!((controller.scale() - 1.47).abs() < 1e-9);
//! ```

use kurbo::{Point, Rect, Size, Vec2};

use crate::config::ViewportConfig;
use crate::geometry::{centroid, distance};

/// Finger distances below this cannot anchor a pinch ratio.
const MIN_PINCH_DISTANCE: f64 = 1e-6;

/// Element that receives the scale transform.
pub trait ScaleTarget {
    /// Unscaled size of the content.
    fn natural_size(&self) -> Size;
    fn set_scale(&mut self, scale: f64);
    /// Smallest box the content must occupy so the scaled result stays
    /// reachable by scrolling.
    fn set_min_extent(&mut self, extent: Size);
}

/// Scrollable box hosting a [`ScaleTarget`].
pub trait ScrollViewport {
    /// Client position of the visible box's top-left corner.
    fn client_origin(&self) -> Point;
    fn client_size(&self) -> Size;
    fn scroll_offset(&self) -> Vec2;
    fn set_scroll_offset(&mut self, offset: Vec2);
    fn set_scroll_extent(&mut self, extent: Size);
    /// Move or resize the visible box, as after a host resize.
    fn set_client_rect(&mut self, rect: Rect);
    fn set_cursor(&mut self, cursor: Cursor);
    fn set_user_select(&mut self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
}

impl Cursor {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledContent {
    pub natural_size: Size,
    pub scale: f64,
    pub min_extent: Size,
}

impl ScaledContent {
    pub fn new(natural_size: Size) -> Self {
        Self {
            natural_size,
            scale: 1.0,
            min_extent: Size::ZERO,
        }
    }

    /// CSS transform applied to the content; the origin stays at the
    /// top-left corner.
    pub fn transform(&self) -> String {
        format!("scale({})", self.scale)
    }
}

impl ScaleTarget for ScaledContent {
    fn natural_size(&self) -> Size {
        self.natural_size
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn set_min_extent(&mut self, extent: Size) {
        self.min_extent = extent;
    }
}

/// Scroll box with browser-like clamping: offsets stay within
/// `[0, extent - client_size]` on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollArea {
    pub client_origin: Point,
    pub client_size: Size,
    pub offset: Vec2,
    pub extent: Size,
    pub cursor: Cursor,
    pub user_select: bool,
}

impl ScrollArea {
    pub fn new(client_origin: Point, client_size: Size) -> Self {
        Self {
            client_origin,
            client_size,
            offset: Vec2::ZERO,
            extent: client_size,
            cursor: Cursor::Default,
            user_select: true,
        }
    }

    fn max_offset(&self) -> Vec2 {
        Vec2::new(
            (self.extent.width - self.client_size.width).max(0.0),
            (self.extent.height - self.client_size.height).max(0.0),
        )
    }
}

impl ScrollViewport for ScrollArea {
    fn client_origin(&self) -> Point {
        self.client_origin
    }

    fn client_size(&self) -> Size {
        self.client_size
    }

    fn scroll_offset(&self) -> Vec2 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: Vec2) {
        let max = self.max_offset();
        self.offset = Vec2::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y));
    }

    fn set_scroll_extent(&mut self, extent: Size) {
        self.extent = Size::new(
            extent.width.max(self.client_size.width),
            extent.height.max(self.client_size.height),
        );
        let offset = self.offset;
        self.set_scroll_offset(offset);
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn set_client_rect(&mut self, rect: Rect) {
        self.client_origin = rect.origin();
        self.client_size = rect.size();
    }

    fn set_user_select(&mut self, enabled: bool) {
        self.user_select = enabled;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Auxiliary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

/// Input delivered to a controller. Positions are client coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    Wheel {
        position: Point,
        delta_y: f64,
    },
    PointerDown {
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        position: Point,
    },
    PointerUp,
    PointerLeave,
    /// Touch points currently on the surface after the change.
    TouchStart {
        touches: Vec<Point>,
    },
    TouchMove {
        touches: Vec<Point>,
    },
    TouchEnd {
        touches: Vec<Point>,
    },
}

/// Whether the controller consumed the event; consumed events should not
/// reach the host's default handling (page scroll, text selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Ignored,
    Handled,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        origin: Point,
        start_offset: Vec2,
    },
    Pinching {
        start_distance: f64,
        start_scale: f64,
    },
}

#[derive(Debug)]
pub struct ViewportController<T, V> {
    target: T,
    viewport: V,
    config: ViewportConfig,
    scale: f64,
    state: GestureState,
}

impl<T: ScaleTarget, V: ScrollViewport> ViewportController<T, V> {
    /// Take over `target` and `viewport`: apply the initial scale, size the
    /// scroll extent to match and switch the cursor to `grab`.
    pub fn attach(mut target: T, mut viewport: V, config: ViewportConfig) -> Self {
        let scale = config.clamp_scale(config.initial_scale);
        viewport.set_cursor(Cursor::Grab);
        viewport.set_user_select(false);
        target.set_scale(scale);
        let mut controller = Self {
            target,
            viewport,
            config,
            scale,
            state: GestureState::Idle,
        };
        controller.update_extent();
        tracing::debug!(scale, "viewport attached");
        controller
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Follow a host resize: the viewport gets its new box and the scroll
    /// extent and offset are re-clamped against it.
    pub fn set_viewport_rect(&mut self, rect: Rect) {
        self.viewport.set_client_rect(rect);
        self.update_extent();
    }

    /// Release the collaborators, restoring the default cursor and text
    /// selection.
    pub fn detach(mut self) -> (T, V) {
        self.viewport.set_cursor(Cursor::Default);
        self.viewport.set_user_select(true);
        tracing::debug!(scale = self.scale, "viewport detached");
        (self.target, self.viewport)
    }

    pub fn handle(&mut self, event: &ViewportEvent) -> EventResponse {
        match event {
            ViewportEvent::Wheel { position, delta_y } => self.on_wheel(*position, *delta_y),
            ViewportEvent::PointerDown {
                position,
                button,
                modifiers,
            } => {
                if *button != PointerButton::Primary || modifiers.ctrl || modifiers.meta {
                    return EventResponse::Ignored;
                }
                self.begin_drag(*position)
            }
            ViewportEvent::PointerMove { position } => self.drag_to(*position),
            ViewportEvent::PointerUp | ViewportEvent::PointerLeave => self.end_drag(),
            ViewportEvent::TouchStart { touches } => self.on_touch_start(touches),
            ViewportEvent::TouchMove { touches } => self.on_touch_move(touches),
            ViewportEvent::TouchEnd { touches } => self.on_touch_end(touches),
        }
    }

    /// Rescale to `requested` (clamped) keeping the content point under
    /// `anchor` in place. Returns the applied scale.
    pub fn zoom_at(&mut self, anchor: Point, requested: f64) -> f64 {
        let next = self.config.clamp_scale(requested);
        let previous = self.scale;
        if (next - previous).abs() < f64::EPSILON {
            return previous;
        }

        let local = anchor - self.viewport.client_origin();
        let content = (local + self.viewport.scroll_offset()) / previous;

        self.scale = next;
        self.target.set_scale(next);
        self.update_extent();
        self.viewport.set_scroll_offset(content * next - local);
        next
    }

    fn update_extent(&mut self) {
        let natural = self.target.natural_size();
        let extent = Size::new(natural.width * self.scale, natural.height * self.scale);
        self.target.set_min_extent(extent);
        self.viewport.set_scroll_extent(extent);
    }

    fn on_wheel(&mut self, position: Point, delta_y: f64) -> EventResponse {
        if delta_y == 0.0 {
            return EventResponse::Ignored;
        }
        let step = if delta_y > 0.0 {
            -self.config.wheel_step
        } else {
            self.config.wheel_step
        };
        self.zoom_at(position, self.scale + step);
        EventResponse::Handled
    }

    fn begin_drag(&mut self, position: Point) -> EventResponse {
        if self.state != GestureState::Idle {
            return EventResponse::Ignored;
        }
        self.state = GestureState::Dragging {
            origin: position,
            start_offset: self.viewport.scroll_offset(),
        };
        self.viewport.set_cursor(Cursor::Grabbing);
        tracing::debug!(x = position.x, y = position.y, "drag started");
        EventResponse::Handled
    }

    fn drag_to(&mut self, position: Point) -> EventResponse {
        let GestureState::Dragging {
            origin,
            start_offset,
        } = self.state
        else {
            return EventResponse::Ignored;
        };
        self.viewport
            .set_scroll_offset(start_offset + (origin - position));
        EventResponse::Handled
    }

    fn end_drag(&mut self) -> EventResponse {
        if !matches!(self.state, GestureState::Dragging { .. }) {
            return EventResponse::Ignored;
        }
        self.state = GestureState::Idle;
        self.viewport.set_cursor(Cursor::Grab);
        tracing::debug!("drag ended");
        EventResponse::Handled
    }

    fn on_touch_start(&mut self, touches: &[Point]) -> EventResponse {
        match touches {
            [first, second, ..] => {
                self.state = GestureState::Pinching {
                    start_distance: distance(*first, *second),
                    start_scale: self.scale,
                };
                self.viewport.set_cursor(Cursor::Grab);
                tracing::debug!(scale = self.scale, "pinch started");
                EventResponse::Handled
            }
            [only] => self.begin_drag(*only),
            [] => EventResponse::Ignored,
        }
    }

    fn on_touch_move(&mut self, touches: &[Point]) -> EventResponse {
        match (self.state, touches) {
            (
                GestureState::Pinching {
                    start_distance,
                    start_scale,
                },
                [first, second, ..],
            ) => {
                if start_distance < MIN_PINCH_DISTANCE {
                    return EventResponse::Handled;
                }
                let ratio = distance(*first, *second) / start_distance;
                if let Some(anchor) = centroid(&[*first, *second]) {
                    self.zoom_at(anchor, start_scale * ratio);
                }
                EventResponse::Handled
            }
            (GestureState::Dragging { .. }, [only]) => self.drag_to(*only),
            _ => EventResponse::Ignored,
        }
    }

    fn on_touch_end(&mut self, touches: &[Point]) -> EventResponse {
        match self.state {
            GestureState::Pinching { .. } if touches.len() < 2 => {
                self.state = GestureState::Idle;
                tracing::debug!(scale = self.scale, "pinch ended");
                EventResponse::Handled
            }
            GestureState::Dragging { .. } if touches.is_empty() => self.end_drag(),
            _ => EventResponse::Ignored,
        }
    }
}
