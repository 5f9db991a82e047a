use crate::config::{Config, load_config};
use crate::layout::LayoutMode;
use crate::layout_dump::write_layout_dump;
use crate::parser::{extract_structure_blocks, parse_diagram};
use crate::render::{write_output_png, write_output_svg};
use crate::shell::RenderedStructure;
use crate::surface::Surface;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use kurbo::Point;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sdr", version, about = "Block-structure diagram renderer")]
pub struct Args {
    /// Input file (.json/.json5 diagram or .md note) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file (theme, themeVariables, structure, routing, viewport)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout mode; overrides the config file and the document
    #[arg(short = 'l', long = "layout", value_enum)]
    pub layout: Option<LayoutArg>,

    /// Width of the host the diagram is centred in
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Write the realized geometry and connectors as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LayoutArg {
    Hierarchical,
    Column,
    /// Alias of `column`
    Auto,
    Flat,
}

impl From<LayoutArg> for LayoutMode {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Hierarchical => LayoutMode::Hierarchical,
            LayoutArg::Column | LayoutArg::Auto => LayoutMode::Column,
            LayoutArg::Flat => LayoutMode::Flat,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut base_config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        base_config.render.width = width;
    }

    let (input, is_markdown) = read_input(args.input.as_deref())?;
    let diagrams = if is_markdown {
        extract_structure_blocks(&input)
    } else {
        vec![input]
    };

    if diagrams.is_empty() {
        return Err(anyhow::anyhow!("No structure diagrams found in input"));
    }

    if diagrams.len() == 1 {
        let rendered = render_one(&diagrams[0], &base_config, &args)?;
        let svg = rendered.to_svg();
        if let Some(path) = args.dump_layout.as_deref() {
            dump(path, &rendered)?;
        }
        match args.output_format {
            OutputFormat::Svg => {
                write_output_svg(&svg, args.output.as_deref())?;
            }
            OutputFormat::Png => {
                let output = ensure_output(&args.output, "png")?;
                write_output_png(&svg, &output, &base_config.render, &rendered.theme)?;
            }
        }
        return Ok(());
    }

    // Multiple diagrams (Markdown input)
    let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, diagrams.len())?;
    let dumps = match args.dump_layout.as_deref() {
        Some(path) => Some(numbered_paths(path, "json", diagrams.len())),
        None => None,
    };
    for (idx, diagram) in diagrams.iter().enumerate() {
        let rendered = render_one(diagram, &base_config, &args)?;
        let svg = rendered.to_svg();
        if let Some(paths) = &dumps {
            dump(&paths[idx], &rendered)?;
        }
        match args.output_format {
            OutputFormat::Svg => {
                write_output_svg(&svg, Some(&outputs[idx]))?;
            }
            OutputFormat::Png => {
                write_output_png(&svg, &outputs[idx], &base_config.render, &rendered.theme)?;
            }
        }
    }

    Ok(())
}

fn render_one(diagram: &str, base: &Config, args: &Args) -> Result<RenderedStructure> {
    let parsed = parse_diagram(diagram)?;
    let mut config = base.clone();
    if let Some(mode) = parsed.layout {
        config.layout.mode = mode;
    }
    if let Some(arg) = args.layout {
        config.layout.mode = arg.into();
    }
    let width = if args.width.is_some() {
        config.render.width
    } else {
        0.0
    };
    let surface = Surface::new("structure-diagram", Point::ZERO, width);
    Ok(RenderedStructure::realize(parsed.graph, surface, &config)?)
}

fn dump(path: &Path, rendered: &RenderedStructure) -> Result<()> {
    write_layout_dump(
        path,
        &rendered.graph,
        &rendered.layout,
        &rendered.surface,
        &rendered.connectors,
    )
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_md = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext, "md" | "markdown"))
            .unwrap_or(false);
        return Ok((content, is_md));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = match format {
        OutputFormat::Svg => "svg",
        OutputFormat::Png => "png",
    };
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        return Ok((0..count)
            .map(|idx| base.join(format!("diagram-{}.{}", idx + 1, ext)))
            .collect());
    }
    Ok(numbered_paths(base, ext, count))
}

fn numbered_paths(base: &Path, ext: &str, count: usize) -> Vec<PathBuf> {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("diagram");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    (0..count)
        .map(|idx| parent.join(format!("{}-{}.{}", stem, idx + 1, ext)))
        .collect()
}
