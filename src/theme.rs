use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub title_font_size: f64,
    pub background: String,
    pub column_background: Option<String>,
    pub block_fill: String,
    pub block_border: String,
    pub title_fill: String,
    pub title_text_color: String,
    pub header_fill: String,
    pub header_text_color: String,
    pub row_text_color: String,
    pub row_divider: String,
    pub link_row_fill: String,
    pub offset_text_color: String,
    pub size_text_color: String,
    pub link_color: String,
    pub link_width: f64,
}

impl Theme {
    /// Palette of the notes viewer the diagrams are embedded in.
    pub fn notes() -> Self {
        Self {
            font_family: "\"SF Mono\", Menlo, Consolas, monospace".to_string(),
            font_size: 13.0,
            title_font_size: 14.0,
            background: "#FFFFFF".to_string(),
            column_background: None,
            block_fill: "#FFFFFF".to_string(),
            block_border: "#D0D7DE".to_string(),
            title_fill: "#F6F8FA".to_string(),
            title_text_color: "#24292F".to_string(),
            header_fill: "#EAEEF2".to_string(),
            header_text_color: "#57606A".to_string(),
            row_text_color: "#24292F".to_string(),
            row_divider: "#EAEEF2".to_string(),
            link_row_fill: "#DDF4FF".to_string(),
            offset_text_color: "#8C959F".to_string(),
            size_text_color: "#8C959F".to_string(),
            link_color: "#0969DA".to_string(),
            link_width: 1.5,
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 14.0,
            background: "#FFFFFF".to_string(),
            column_background: Some("#F7FAFF".to_string()),
            block_fill: "#F8FAFF".to_string(),
            block_border: "#C7D2E5".to_string(),
            title_fill: "#EEF2F8".to_string(),
            title_text_color: "#1C2430".to_string(),
            header_fill: "#F1F4F9".to_string(),
            header_text_color: "#4B5A70".to_string(),
            row_text_color: "#1C2430".to_string(),
            row_divider: "#E3E8F0".to_string(),
            link_row_fill: "#E8F0FE".to_string(),
            offset_text_color: "#7A8AA6".to_string(),
            size_text_color: "#7A8AA6".to_string(),
            link_color: "#7A8AA6".to_string(),
            link_width: 1.4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "notes" | "default" | "base" => Some(Self::notes()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::notes()
    }
}
