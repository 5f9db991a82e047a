use serde::Deserialize;
use structure_rs_renderer::layout::LayoutMode;
use structure_rs_renderer::{RenderOptions, render_with_options};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureRenderOptions {
    theme: Option<String>,
    layout: Option<String>,
    font_family: Option<String>,
    font_size: Option<f64>,
    fast_text: Option<bool>,
}

fn build_render_options(options: StructureRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("modern") {
        RenderOptions::modern()
    } else {
        RenderOptions::notes()
    };

    if let Some(mode) = options.layout.as_deref().and_then(LayoutMode::from_token) {
        render_options.layout.mode = mode;
    }
    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    // No system fonts are reachable from wasm; default to the estimate.
    render_options.layout.fast_text_metrics = options.fast_text.unwrap_or(true);

    render_options
}

#[wasm_bindgen]
pub fn render_structure_svg(code: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<StructureRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        StructureRenderOptions::default()
    };

    let render_options = build_render_options(options);
    render_with_options(code, render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use structure_rs_renderer::render_with_options;

    use crate::{StructureRenderOptions, build_render_options};

    #[test]
    fn renders_linked_blocks() {
        let code = r#"{
  "blocks": [
    { "id": "hdr", "title": "Header", "rows": [
      { "offset": "0x00", "name": "magic", "type": "u32", "size": "4" },
      { "offset": "0x04", "name": "table", "type": "u32", "size": "4", "linkTo": "tbl" }
    ] },
    { "id": "tbl", "title": "Table", "rows": [{ "name": "count", "type": "u16" }] }
  ]
}"#;

        let svg = render_with_options(code, build_render_options(StructureRenderOptions::default()))
            .expect("linked blocks should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("u32 magic"));
        assert!(svg.contains("table-link-path"));
    }

    #[test]
    fn layout_option_is_applied() {
        let options = build_render_options(StructureRenderOptions {
            layout: Some("flat".to_string()),
            ..Default::default()
        });
        assert_eq!(options.layout.mode, structure_rs_renderer::LayoutMode::Flat);
    }
}
