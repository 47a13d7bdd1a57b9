//! Render the Kibo keymap as an HTML page with one inline SVG per layer.

use kibo_core::config::{LAYER_COUNT, SWITCH_COUNT};
use kibo_core::{Half, KeyBinding, KeyMap, Layer, SwitchIndex};

/// Where one switch sits on the page.
struct Key {
    x: f64,
    y: f64,
    half: Half,
    switch: SwitchIndex,
}

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
const R: f64 = 4.0;
const HALF_GAP: f64 = 80.0;
const MARGIN: f64 = 20.0;

/// Column stagger in units of `S`, outer column first.
const STAGGER: [f64; 6] = [0.40, 0.30, 0.05, 0.00, 0.10, 0.20];

/// Switch index ranges per row, in index order.
const TOP: core::ops::Range<u8> = 0..6;
const HOME: core::ops::Range<u8> = 6..12;
const BOTTOM: core::ops::Range<u8> = 12..17;
const THUMB: core::ops::Range<u8> = 17..20;

fn build_keys() -> Vec<Key> {
    let mut keys = Vec::with_capacity(2 * SWITCH_COUNT);
    build_half(&mut keys, Half::Left, 0.0);
    build_half(&mut keys, Half::Right, 6.0 * S + HALF_GAP);
    keys
}

/// Left switches run outer to inner; right switches run inner to outer,
/// so both halves draw left to right in index order. The outer column has
/// no bottom-row key.
fn build_half(keys: &mut Vec<Key>, half: Half, bx: f64) {
    let stagger = |col: usize| match half {
        Half::Left => STAGGER[col],
        Half::Right => STAGGER[5 - col],
    };
    let mut push = |index: u8, col: usize, row: f64| {
        if let Some(switch) = SwitchIndex::new(index) {
            keys.push(Key {
                x: bx + col as f64 * S,
                y: (row + stagger(col)) * S,
                half,
                switch,
            });
        }
    };

    for (col, index) in TOP.enumerate() {
        push(index, col, 0.0);
    }
    for (col, index) in HOME.enumerate() {
        push(index, col, 1.0);
    }

    let bottom_first = match half {
        Half::Left => 1,
        Half::Right => 0,
    };
    for (i, index) in BOTTOM.enumerate() {
        push(index, bottom_first + i, 2.0);
    }

    // Thumbs sit under the three inner columns, half a row lower.
    let thumb_first = match half {
        Half::Left => 3,
        Half::Right => 0,
    };
    for (i, index) in THUMB.enumerate() {
        push(index, thumb_first + i, 3.25);
    }
}

fn bbox(keys: &[Key]) -> (f64, f64) {
    keys.iter().fold((0.0f64, 0.0f64), |(w, h), k| {
        (w.max(k.x + U), h.max(k.y + U))
    })
}

fn label(binding: &KeyBinding) -> String {
    match binding {
        KeyBinding::LayerToggle => "Layer".to_string(),
        KeyBinding::Chord(chord) => chord
            .keys()
            .iter()
            .map(|kc| kc.display_name())
            .collect::<Vec<_>>()
            .join("+"),
    }
}

fn key_class(binding: &KeyBinding) -> &'static str {
    match binding {
        KeyBinding::LayerToggle => "key layer",
        KeyBinding::Chord(chord) if chord.keys().iter().any(|kc| kc.is_modifier()) => {
            "key modifier"
        }
        KeyBinding::Chord(_) => "key",
    }
}

fn layer_title(layer: Layer) -> String {
    match layer.index() {
        0 => "Layer 0 (Base)".to_string(),
        n => format!("Layer {n}"),
    }
}

fn render_layer(keymap: &KeyMap, keys: &[Key], layer: Layer, y_offset: f64) -> String {
    let mut svg = format!(r#"<g transform="translate({MARGIN}, {y_offset})">"#);

    svg.push_str(&format!(
        r#"<text x="0" y="-10" class="layer-title">{}</text>"#,
        layer_title(layer)
    ));

    for key in keys {
        let binding = keymap.resolve(key.half, layer, key.switch);
        let text = label(&binding);

        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{U}" height="{U}" rx="{R}" class="{}"><title>{:?} #{}</title></rect>"#,
            key.x,
            key.y,
            key_class(&binding),
            key.half,
            key.switch.get(),
        ));

        let font_class = if text.chars().count() > 4 { " small" } else { "" };
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" class="label{font_class}">{}</text>"#,
            key.x + U / 2.0,
            key.y + U / 2.0 + 1.0,
            html_escape(&text),
        ));
    }

    svg.push_str("</g>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const STYLE: &str = r#"
  body {
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }
  .key { fill: #16213e; stroke: #0f3460; stroke-width: 1.5; }
  .key:hover { fill: #1a1a5e; stroke: #e94560; }
  .key.layer { fill: #2d1b4e; stroke: #e94560; stroke-width: 2; }
  .key.modifier { fill: #1b2e4e; stroke: #53a8b6; }
  .label {
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 13px;
    text-anchor: middle;
    dominant-baseline: middle;
    pointer-events: none;
  }
  .label.small { font-size: 9px; }
  .layer-title { fill: #e94560; font-size: 16px; font-weight: bold; }
"#;

/// The complete page for `keymap`, layers stacked top to bottom.
pub fn generate_html(keymap: &KeyMap) -> String {
    let keys = build_keys();
    let (content_w, content_h) = bbox(&keys);
    let layer_height = content_h + 60.0;
    let total_width = content_w + 2.0 * MARGIN;
    let total_height = LAYER_COUNT as f64 * layer_height + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Kibo Layout</title>
<style>{STYLE}</style>
</head>
<body>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    for index in 0..LAYER_COUNT as u8 {
        let Some(layer) = Layer::new(index) else {
            continue;
        };
        let y_offset = MARGIN + index as f64 * layer_height + 30.0;
        html.push_str(&render_layer(keymap, &keys, layer, y_offset));
        html.push('\n');
    }

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}
