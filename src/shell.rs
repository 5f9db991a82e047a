//! Host shell: the named render targets a page exposes and the zoom overlay
//! a diagram is cloned or re-rendered into.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use kurbo::{Point, Rect, Size};
use thiserror::Error;

use crate::config::{Config, RoutingConfig, ViewportConfig};
use crate::events::{ResizeHub, Subscription};
use crate::ir::BlockGraph;
use crate::layout::{LayoutError, StructureLayout, compute_layout};
use crate::render::{render_svg, render_zoomed_svg};
use crate::routing::{ConnectorSet, route_connectors};
use crate::surface::Surface;
use crate::theme::Theme;
use crate::viewport::{EventResponse, ScaledContent, ScrollArea, ViewportController, ViewportEvent};

/// Resize key used by the zoom overlay's own listener.
pub const OVERLAY_KEY: &str = "zoom-overlay";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("surface `{0}` is not mounted")]
    NotMounted(String),
    #[error("diagram source produced no SVG")]
    EmptyRender,
    #[error("failed to render diagram source: {0}")]
    Render(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A structure diagram realized on a surface, with its connectors.
#[derive(Debug)]
pub struct RenderedStructure {
    pub graph: BlockGraph,
    pub layout: StructureLayout,
    pub surface: Surface,
    pub connectors: ConnectorSet,
    pub theme: Theme,
    pub routing: RoutingConfig,
}

impl RenderedStructure {
    /// Lay out, mount and route `graph` on `surface`. Connectors are routed
    /// from the surface's ready callback, never from unmounted geometry.
    pub fn realize(graph: BlockGraph, mut surface: Surface, config: &Config) -> Result<Self, LayoutError> {
        let layout = compute_layout(&graph, config.layout.mode)?;
        let routed: Rc<RefCell<Option<ConnectorSet>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&routed);
        let route_graph = graph.clone();
        let routing = config.routing.clone();
        surface.on_ready(move |surface| {
            *sink.borrow_mut() = Some(route_connectors(&route_graph, surface, &routing));
        });
        surface.mount(&graph, &layout, &config.theme, &config.layout);
        let connectors = routed.borrow_mut().take().unwrap_or_default();
        Ok(Self {
            graph,
            layout,
            surface,
            connectors,
            theme: config.theme.clone(),
            routing: config.routing.clone(),
        })
    }

    /// Re-centre for a new host width and re-measure every connector.
    pub fn reflow(&mut self, width: f64) {
        self.surface.resize(width);
        self.reroute();
    }

    pub fn reroute(&mut self) {
        self.connectors = route_connectors(&self.graph, &self.surface, &self.routing);
        tracing::debug!(
            surface = self.surface.key(),
            connectors = self.connectors.len(),
            "connectors re-routed"
        );
    }

    pub fn to_svg(&self) -> String {
        render_svg(&self.graph, &self.surface, &self.connectors, &self.theme)
    }
}

struct RenderTarget {
    origin: Point,
    content: Option<Rc<RefCell<RenderedStructure>>>,
    _resize: Option<Subscription>,
}

/// Owner of every render target on a page.
pub struct HostShell {
    hub: ResizeHub,
    viewport: Size,
    targets: BTreeMap<String, RenderTarget>,
    overlay: ZoomOverlay,
}

impl HostShell {
    pub fn new(viewport: Size, viewport_config: ViewportConfig) -> Self {
        let hub = ResizeHub::new();
        let overlay = ZoomOverlay::new(
            hub.clone(),
            Rect::from_origin_size(Point::ZERO, viewport),
            viewport_config,
        );
        Self {
            hub,
            viewport,
            targets: BTreeMap::new(),
            overlay,
        }
    }

    pub fn hub(&self) -> &ResizeHub {
        &self.hub
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    /// Register an empty render target whose top-left sits at `origin`.
    pub fn add_surface(&mut self, key: impl Into<String>, origin: Point) {
        self.targets.insert(
            key.into(),
            RenderTarget {
                origin,
                content: None,
                _resize: None,
            },
        );
    }

    /// Render `graph` into the target named `key`. A missing target is
    /// logged and yields `Ok(None)`; only a cyclic hierarchy is an error.
    pub fn render_structure(
        &mut self,
        key: &str,
        graph: BlockGraph,
        config: &Config,
    ) -> Result<Option<ConnectorSet>, LayoutError> {
        let Some(target) = self.targets.get_mut(key) else {
            tracing::warn!(surface = key, "render target not found; nothing rendered");
            return Ok(None);
        };

        let surface = Surface::new(key, target.origin, self.viewport.width);
        let rendered = RenderedStructure::realize(graph, surface, config)?;
        let connectors = rendered.connectors.clone();
        let content = Rc::new(RefCell::new(rendered));

        let weak: Weak<RefCell<RenderedStructure>> = Rc::downgrade(&content);
        let subscription = self.hub.subscribe(key, move |size: Size| {
            if let Some(content) = weak.upgrade() {
                content.borrow_mut().reflow(size.width);
            }
        });
        target.content = Some(content);
        target._resize = Some(subscription);
        Ok(Some(connectors))
    }

    pub fn rendered(&self, key: &str) -> Option<Ref<'_, RenderedStructure>> {
        self.targets
            .get(key)?
            .content
            .as_ref()
            .map(|content| content.borrow())
    }

    /// Propagate a host resize to every rendered target and the overlay.
    pub fn resize(&mut self, viewport: Size) -> usize {
        self.viewport = viewport;
        self.overlay.set_client_rect(Rect::from_origin_size(Point::ZERO, viewport));
        self.hub.notify(viewport)
    }

    /// Open the overlay on a clone of the target named `key`.
    pub fn zoom(&mut self, key: &str) -> Result<bool, ShellError> {
        let Some(content) = self.targets.get(key).and_then(|target| target.content.clone()) else {
            tracing::warn!(surface = key, "zoom requested for unknown or empty target");
            return Ok(false);
        };
        let content = content.borrow();
        self.overlay.open_clone(&content)?;
        Ok(true)
    }

    pub fn overlay(&self) -> &ZoomOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut ZoomOverlay {
        &mut self.overlay
    }
}

/// Keys the overlay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub svg: String,
    /// Natural size measured after rendering.
    pub size: Size,
}

/// Anything that can render a diagram afresh for the overlay.
pub trait DiagramSource {
    fn render(&self) -> Result<RenderedDiagram, ShellError>;
}

/// Structure diagram rendered from its block graph.
#[derive(Debug, Clone)]
pub struct StructureSource {
    pub graph: BlockGraph,
    pub config: Config,
}

impl DiagramSource for StructureSource {
    fn render(&self) -> Result<RenderedDiagram, ShellError> {
        let surface = Surface::new(OVERLAY_KEY, Point::ZERO, 0.0);
        let rendered = RenderedStructure::realize(self.graph.clone(), surface, &self.config)?;
        Ok(RenderedDiagram {
            svg: rendered.to_svg(),
            size: rendered.surface.content_size(),
        })
    }
}

/// SVG produced by some other renderer, e.g. a flow diagram drawn from its
/// source code by the host.
#[derive(Debug, Clone)]
pub struct PrerenderedSvg {
    pub svg: String,
    pub size: Size,
}

impl DiagramSource for PrerenderedSvg {
    fn render(&self) -> Result<RenderedDiagram, ShellError> {
        if self.svg.trim().is_empty() {
            return Err(ShellError::EmptyRender);
        }
        Ok(RenderedDiagram {
            svg: self.svg.clone(),
            size: self.size,
        })
    }
}

#[derive(Debug)]
pub enum OverlayContent {
    Structure(RenderedStructure),
    Svg(RenderedDiagram),
}

impl OverlayContent {
    pub fn natural_size(&self) -> Size {
        match self {
            Self::Structure(rendered) => rendered.surface.content_size(),
            Self::Svg(diagram) => diagram.size,
        }
    }

    pub fn svg(&self) -> String {
        match self {
            Self::Structure(rendered) => rendered.to_svg(),
            Self::Svg(diagram) => diagram.svg.clone(),
        }
    }
}

/// One activation of the overlay. Everything it holds, including the
/// controller and the resize listener, is dropped on close.
pub struct ZoomSession {
    content: Rc<RefCell<OverlayContent>>,
    controller: ViewportController<ScaledContent, ScrollArea>,
    _resize: Subscription,
}

impl ZoomSession {
    pub fn controller(&self) -> &ViewportController<ScaledContent, ScrollArea> {
        &self.controller
    }

    pub fn content(&self) -> Ref<'_, OverlayContent> {
        self.content.borrow()
    }

    pub fn scale(&self) -> f64 {
        self.controller.scale()
    }

    /// The content framed at the current scale.
    pub fn zoomed_svg(&self) -> String {
        let content = self.content.borrow();
        render_zoomed_svg(&content.svg(), content.natural_size(), self.controller.scale())
    }
}

pub struct ZoomOverlay {
    hub: ResizeHub,
    client: Rect,
    viewport: ViewportConfig,
    session: Option<ZoomSession>,
}

impl ZoomOverlay {
    pub fn new(hub: ResizeHub, client: Rect, viewport: ViewportConfig) -> Self {
        Self {
            hub,
            client,
            viewport,
            session: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&ZoomSession> {
        self.session.as_ref()
    }

    pub fn set_client_rect(&mut self, client: Rect) {
        self.client = client;
        if let Some(session) = self.session.as_mut() {
            session.controller.set_viewport_rect(client);
        }
    }

    /// Show a copy of an already realized structure. The copy is mounted
    /// into the overlay and its connectors are routed there.
    pub fn open_clone(&mut self, source: &RenderedStructure) -> Result<(), ShellError> {
        if !source.surface.is_mounted() {
            return Err(ShellError::NotMounted(source.surface.key().to_string()));
        }
        let surface = source
            .surface
            .duplicate(OVERLAY_KEY, self.client.origin());
        let mut copy = RenderedStructure {
            graph: source.graph.clone(),
            layout: source.layout.clone(),
            surface,
            connectors: ConnectorSet::default(),
            theme: source.theme.clone(),
            routing: source.routing.clone(),
        };
        copy.reflow(0.0);
        self.activate(OverlayContent::Structure(copy));
        Ok(())
    }

    /// Render `source` afresh and show it. On failure the overlay stays
    /// closed and no controller is created.
    pub fn open_rerender(&mut self, source: &dyn DiagramSource) -> Result<(), ShellError> {
        self.close();
        let diagram = source.render()?;
        if diagram.svg.trim().is_empty() {
            return Err(ShellError::EmptyRender);
        }
        self.activate(OverlayContent::Svg(diagram));
        Ok(())
    }

    fn activate(&mut self, content: OverlayContent) {
        self.close();
        let natural = content.natural_size();
        let controller = ViewportController::attach(
            ScaledContent::new(natural),
            ScrollArea::new(self.client.origin(), self.client.size()),
            self.viewport.clone(),
        );
        let content = Rc::new(RefCell::new(content));
        let weak = Rc::downgrade(&content);
        let subscription = self.hub.subscribe(OVERLAY_KEY, move |_| {
            let Some(content) = weak.upgrade() else {
                return;
            };
            if let OverlayContent::Structure(rendered) = &mut *content.borrow_mut() {
                rendered.reroute();
            }
        });
        tracing::debug!(
            width = natural.width,
            height = natural.height,
            scale = controller.scale(),
            "zoom overlay opened"
        );
        self.session = Some(ZoomSession {
            content,
            controller,
            _resize: subscription,
        });
    }

    /// Close the overlay, discarding the session. Returns whether it was
    /// open.
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                let (_content, _area) = session.controller.detach();
                tracing::debug!("zoom overlay closed");
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape if self.is_open() => self.close(),
            _ => false,
        }
    }

    pub fn click_backdrop(&mut self) -> bool {
        self.close()
    }

    pub fn dispatch(&mut self, event: &ViewportEvent) -> EventResponse {
        match self.session.as_mut() {
            Some(session) => session.controller.handle(event),
            None => EventResponse::Ignored,
        }
    }
}
