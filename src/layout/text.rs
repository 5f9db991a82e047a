use crate::config::LayoutConfig;
use crate::text_metrics;

use super::TextBlock;

/// Measure a label, wrapping on whitespace once a line would exceed
/// `max_chars` average characters (`0` disables wrapping).
pub fn measure_text(
    text: &str,
    font_size: f64,
    font_family: &str,
    max_chars: usize,
    config: &LayoutConfig,
) -> TextBlock {
    let fast = config.fast_text_metrics;
    let max_width = if max_chars == 0 {
        f64::INFINITY
    } else {
        max_chars as f64 * average_char_width(font_family, font_size, fast)
    };

    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font_size, font_family, fast));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, font_family, fast))
        .fold(0.0, f64::max);
    let height = lines.len() as f64 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

pub(super) fn wrap_line(
    line: &str,
    max_width: f64,
    font_size: f64,
    font_family: &str,
    fast: bool,
) -> Vec<String> {
    if text_width(line, font_size, font_family, fast) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && text_width(&candidate, font_size, font_family, fast) > max_width
        {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(super) fn text_width(text: &str, font_size: f64, font_family: &str, fast: bool) -> f64 {
    if fast {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

/// Width estimate used when no font is available: em fractions for a few
/// character classes, full width for CJK.
pub(super) fn fallback_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

fn char_width_factor(ch: char) -> f64 {
    match ch {
        'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.28,
        ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '{' | '}' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.88,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.58,
        '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7A3}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FF60}' => 1.0,
        _ => 0.56,
    }
}

fn average_char_width(font_family: &str, font_size: f64, fast: bool) -> f64 {
    if fast {
        return font_size * 0.56;
    }
    text_metrics::average_char_width(font_family, font_size).unwrap_or(font_size * 0.56)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        }
    }

    #[test]
    fn split_lines_handles_br_tags() {
        assert_eq!(split_lines("a<br/>b"), vec!["a", "b"]);
        assert_eq!(split_lines(" a <br> b \n c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w12 = fallback_text_width("Header", 12.0);
        let w24 = fallback_text_width("Header", 24.0);
        assert!((w24 - w12 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn wide_characters_measure_wider() {
        assert!(fallback_text_width("结构", 10.0) > fallback_text_width("ab", 10.0));
    }

    #[test]
    fn long_titles_wrap() {
        let block = measure_text(
            "a rather long block title that keeps going",
            14.0,
            "monospace",
            12,
            &fast_config(),
        );
        assert!(block.lines.len() > 1, "expected wrapping, got {:?}", block.lines);
    }

    #[test]
    fn zero_max_chars_never_wraps() {
        let block = measure_text("u32 length of the payload in bytes", 13.0, "monospace", 0, &fast_config());
        assert_eq!(block.lines.len(), 1);
        assert!(block.width > 0.0);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let block = measure_text("", 13.0, "monospace", 10, &fast_config());
        assert_eq!(block.lines, vec![String::new()]);
        assert_eq!(block.width, 0.0);
        assert!(block.height > 0.0);
    }
}
