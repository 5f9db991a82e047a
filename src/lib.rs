#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod events;
pub mod geometry;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod routing;
pub mod shell;
pub mod surface;
pub mod text_metrics;
pub mod theme;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;

pub use config::{Config, LayoutConfig, RoutingConfig, ViewportConfig};
pub use ir::{Block, BlockGraph, Link, LinkSide, Row};
pub use layout::{LayoutError, LayoutMode, StructureLayout, compute_layout};
pub use parser::{ParseError, ParsedDiagram, extract_structure_blocks, parse_diagram};
pub use routing::{ConnectorPath, ConnectorSet, route_connectors};
pub use shell::{HostShell, RenderedStructure, ShellError};
pub use surface::{ElementKey, Measure, Surface};
pub use theme::Theme;
pub use viewport::{ViewportController, ViewportEvent};

use kurbo::Point;

/// Everything needed to turn a diagram document into SVG.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub routing: RoutingConfig,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::notes()
    }
}

impl RenderOptions {
    pub fn notes() -> Self {
        Self {
            theme: Theme::notes(),
            layout: LayoutConfig::default(),
            routing: RoutingConfig::default(),
        }
    }

    pub fn modern() -> Self {
        Self {
            theme: Theme::modern(),
            ..Self::notes()
        }
    }

    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.layout.mode = mode;
        self
    }

    fn into_config(self) -> Config {
        let mut config = Config {
            theme: self.theme,
            layout: self.layout,
            routing: self.routing,
            ..Default::default()
        };
        config.render.background = config.theme.background.clone();
        config
    }
}

impl From<&Config> for RenderOptions {
    fn from(config: &Config) -> Self {
        Self {
            theme: config.theme.clone(),
            layout: config.layout.clone(),
            routing: config.routing.clone(),
        }
    }
}

/// Parse, lay out, mount and route a diagram document; the document's own
/// `layout` field wins over `options`.
pub fn render_structure(input: &str, options: RenderOptions) -> anyhow::Result<RenderedStructure> {
    let parsed = parse_diagram(input)?;
    let mut config = options.into_config();
    if let Some(mode) = parsed.layout {
        config.layout.mode = mode;
    }
    let surface = Surface::new("structure-diagram", Point::ZERO, 0.0);
    Ok(RenderedStructure::realize(parsed.graph, surface, &config)?)
}

pub fn render_with_options(input: &str, options: RenderOptions) -> anyhow::Result<String> {
    Ok(render_structure(input, options)?.to_svg())
}

pub fn render(input: &str) -> anyhow::Result<String> {
    render_with_options(input, RenderOptions::default())
}
