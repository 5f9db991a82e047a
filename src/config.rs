use crate::layout::LayoutMode;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub mode: LayoutMode,
    /// Horizontal gap between level columns (and between blocks in flat mode).
    pub column_gap: f64,
    /// Vertical gap between blocks stacked in one column.
    pub block_gap: f64,
    pub surface_padding: f64,
    pub cell_padding_x: f64,
    pub row_padding_y: f64,
    pub title_padding_y: f64,
    pub min_block_width: f64,
    pub scroll_max_height: f64,
    pub label_line_height: f64,
    pub max_title_width_chars: usize,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Hierarchical,
            column_gap: 60.0,
            block_gap: 24.0,
            surface_padding: 16.0,
            cell_padding_x: 10.0,
            row_padding_y: 5.0,
            title_padding_y: 7.0,
            min_block_width: 120.0,
            scroll_max_height: 320.0,
            label_line_height: 1.4,
            max_title_width_chars: 40,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Segments whose |dx| or |dy| is below this are drawn straight.
    pub axis_snap: f64,
    pub start_handle_min: f64,
    pub start_handle_ratio: f64,
    pub end_handle_min: f64,
    pub end_handle_ratio: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            axis_snap: 10.0,
            start_handle_min: 30.0,
            start_handle_ratio: 0.3,
            end_handle_min: 20.0,
            end_handle_ratio: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub initial_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            initial_scale: 1.5,
            min_scale: 0.5,
            max_scale: 5.0,
            wheel_step: 0.03,
        }
    }
}

impl ViewportConfig {
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if !(self.min_scale.is_finite() && self.max_scale.is_finite()) {
            let defaults = Self::default();
            return scale.clamp(defaults.min_scale, defaults.max_scale);
        }
        let (lo, hi) = if self.min_scale <= self.max_scale {
            (self.min_scale, self.max_scale)
        } else {
            (self.max_scale, self.min_scale)
        };
        scale.clamp(lo, hi)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Width of the host viewport the diagram is mounted into.
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub routing: RoutingConfig,
    pub viewport: ViewportConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::notes();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            routing: RoutingConfig::default(),
            viewport: ViewportConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f64>,
    title_font_size: Option<f64>,
    background: Option<String>,
    block_fill: Option<String>,
    block_border: Option<String>,
    title_fill: Option<String>,
    title_text_color: Option<String>,
    row_text_color: Option<String>,
    link_row_fill: Option<String>,
    link_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    layout: Option<String>,
    column_gap: Option<f64>,
    block_gap: Option<f64>,
    surface_padding: Option<f64>,
    min_block_width: Option<f64>,
    scroll_max_height: Option<f64>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    axis_snap: Option<f64>,
    start_handle_min: Option<f64>,
    start_handle_ratio: Option<f64>,
    end_handle_min: Option<f64>,
    end_handle_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    initial_scale: Option<f64>,
    min_scale: Option<f64>,
    max_scale: Option<f64>,
    wheel_step: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    structure: Option<LayoutConfigFile>,
    routing: Option<RoutingConfigFile>,
    viewport: Option<ViewportConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    parse_config(&contents, is_json5)
}

pub fn parse_config(contents: &str, json5: bool) -> anyhow::Result<Config> {
    let parsed: ConfigFile = if json5 {
        json5::from_str(contents)?
    } else {
        serde_json::from_str(contents)?
    };
    Ok(apply_config_file(Config::default(), parsed))
}

fn apply_config_file(mut config: Config, parsed: ConfigFile) -> Config {
    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme; keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.title_font_size {
            theme.title_font_size = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
        if let Some(v) = vars.block_fill {
            theme.block_fill = v;
        }
        if let Some(v) = vars.block_border {
            theme.block_border = v;
        }
        if let Some(v) = vars.title_fill {
            theme.title_fill = v;
        }
        if let Some(v) = vars.title_text_color {
            theme.title_text_color = v;
        }
        if let Some(v) = vars.row_text_color {
            theme.row_text_color = v;
        }
        if let Some(v) = vars.link_row_fill {
            theme.link_row_fill = v;
        }
        if let Some(v) = vars.link_color {
            theme.link_color = v;
        }
    }
    config.render.background = config.theme.background.clone();

    if let Some(layout) = parsed.structure {
        if let Some(token) = layout.layout.as_deref() {
            match LayoutMode::from_token(token) {
                Some(mode) => config.layout.mode = mode,
                None => tracing::warn!(layout = token, "unknown layout mode; keeping default"),
            }
        }
        if let Some(v) = layout.column_gap {
            config.layout.column_gap = v;
        }
        if let Some(v) = layout.block_gap {
            config.layout.block_gap = v;
        }
        if let Some(v) = layout.surface_padding {
            config.layout.surface_padding = v;
        }
        if let Some(v) = layout.min_block_width {
            config.layout.min_block_width = v;
        }
        if let Some(v) = layout.scroll_max_height {
            config.layout.scroll_max_height = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }

    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.axis_snap {
            config.routing.axis_snap = v;
        }
        if let Some(v) = routing.start_handle_min {
            config.routing.start_handle_min = v;
        }
        if let Some(v) = routing.start_handle_ratio {
            config.routing.start_handle_ratio = v;
        }
        if let Some(v) = routing.end_handle_min {
            config.routing.end_handle_min = v;
        }
        if let Some(v) = routing.end_handle_ratio {
            config.routing.end_handle_ratio = v;
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = scale_option("initialScale", viewport.initial_scale) {
            config.viewport.initial_scale = v;
        }
        if let Some(v) = scale_option("minScale", viewport.min_scale) {
            config.viewport.min_scale = v;
        }
        if let Some(v) = scale_option("maxScale", viewport.max_scale) {
            config.viewport.max_scale = v;
        }
        if let Some(v) = scale_option("wheelStep", viewport.wheel_step) {
            config.viewport.wheel_step = v;
        }
    }

    config
}

/// Scale settings must be positive and finite; JSON5 happily parses `NaN`.
fn scale_option(field: &str, value: Option<f64>) -> Option<f64> {
    let v = value?;
    if v.is_finite() && v > 0.0 {
        Some(v)
    } else {
        tracing::warn!(field, value = v, "invalid viewport setting; keeping default");
        None
    }
}
