//! DOM border heuristics.
//!
//! Out-of-flow elements are tested as edge bars from their declared
//! offsets; every element is also tested from its bounding rectangle,
//! both as a bar and as a viewport-sized box with its own borders.

use core_types::{Rectangle, Size};
use css::syntax::tokenize_value;
use css::{is_visible_color, parse_length, parse_offset, parse_percentage, parse_position, parse_stylesheet};

use super::Edges;
use crate::capability::view::{DocumentView, ElementSnapshot};
use crate::config::GeometryConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    fn name(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    // Index into a 1-4 value box shorthand (top, right, bottom, left).
    fn box_index(self, len: usize) -> Option<usize> {
        let i = match (len, self) {
            (1, _) => 0,
            (2, Side::Top | Side::Bottom) => 0,
            (2, _) => 1,
            (3, Side::Top) => 0,
            (3, Side::Bottom) => 2,
            (3, _) => 1,
            (n, side) if n >= 4 => side as usize,
            _ => return None,
        };
        Some(i)
    }

    fn set(self, edges: &mut Edges) {
        match self {
            Side::Top => edges.top = true,
            Side::Right => edges.right = true,
            Side::Bottom => edges.bottom = true,
            Side::Left => edges.left = true,
        }
    }
}

// Distances from each viewport edge plus the element's extent.
#[derive(Clone, Copy, Debug)]
struct Placement {
    top: Option<f32>,
    right: Option<f32>,
    bottom: Option<f32>,
    left: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
}

impl Placement {
    fn from_rect(rect: Rectangle, viewport: Size) -> Placement {
        Placement {
            top: Some(rect.y),
            right: Some(viewport.width - rect.right()),
            bottom: Some(viewport.height - rect.bottom()),
            left: Some(rect.x),
            width: Some(rect.width),
            height: Some(rect.height),
        }
    }

    fn from_style(el: &ElementSnapshot, viewport: Size) -> Placement {
        let offset = |name: &str| el.style(name).and_then(parse_offset);
        let extent = |name: &str, full: f32| {
            let v = el.style(name)?;
            parse_length(v)
                .map(|l| l.px())
                .or_else(|| parse_percentage(v).map(|p| p * full))
        };
        // declared extents exclude the border box
        let framed = |extent: f32, a: Side, b: Side| extent + border_px(el, a) + border_px(el, b);
        let rect = (!el.rect.is_empty()).then_some(el.rect);
        Placement {
            top: offset("top"),
            right: offset("right"),
            bottom: offset("bottom"),
            left: offset("left"),
            width: extent("width", viewport.width)
                .map(|w| framed(w, Side::Left, Side::Right))
                .or(rect.map(|r| r.width)),
            height: extent("height", viewport.height)
                .map(|h| framed(h, Side::Top, Side::Bottom))
                .or(rect.map(|r| r.height)),
        }
    }
}

/// Border sides found in the document.
pub fn scan_dom(view: &dyn DocumentView, config: &GeometryConfig) -> Edges {
    let viewport = view.viewport();
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return Edges::default();
    }

    let mut edges = Edges::default();
    let elements = view.elements(config.max_elements);
    for el in &elements {
        if !has_paint(el) && !has_any_border(el) {
            continue;
        }
        let positioned = el
            .style("position")
            .and_then(parse_position)
            .is_some_and(|p| p.is_out_of_flow());
        let paint = bar_paint(el, config);
        if positioned {
            bar_edges(&Placement::from_style(el, viewport), paint, viewport, config, &mut edges);
        }
        if !el.rect.is_empty() {
            bar_edges(&Placement::from_rect(el.rect, viewport), paint, viewport, config, &mut edges);
            box_border_edges(el, viewport, config, &mut edges);
        }
        if edges == Edges::ALL {
            break;
        }
    }
    log::debug!(
        target: "monitor.geometry",
        "dom pass over {} elements: {} sides",
        elements.len(),
        edges.count()
    );
    edges
}

/// Stylesheet rules that declare a border or an outline.
pub fn count_border_rules(sheets: &[String]) -> u32 {
    sheets
        .iter()
        .flat_map(|text| parse_stylesheet(text).rules)
        .filter(|rule| rule.declarations.iter().any(|d| is_border_property(&d.name)))
        .count() as u32
}

fn is_border_property(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("outline") {
        return !name.ends_with("offset");
    }
    name.starts_with("border")
        && !matches!(
            name.as_str(),
            "border-radius" | "border-collapse" | "border-spacing"
        )
        && !name.ends_with("-radius")
}

fn thin(v: f32, config: &GeometryConfig) -> bool {
    v >= config.min_thickness_px && v <= config.max_thickness_px
}

// Which bar orientations the element paints, from its fill or from a
// thin visible border across the bar's thickness.
#[derive(Clone, Copy, Debug, Default)]
struct BarPaint {
    horizontal: bool,
    vertical: bool,
}

fn bar_paint(el: &ElementSnapshot, config: &GeometryConfig) -> BarPaint {
    let fill = has_paint(el);
    let edge = |side| side_border(el, side).is_some_and(|b| b.visible && thin(b.width, config));
    BarPaint {
        horizontal: fill || edge(Side::Top) || edge(Side::Bottom),
        vertical: fill || edge(Side::Left) || edge(Side::Right),
    }
}

fn bar_edges(p: &Placement, paint: BarPaint, viewport: Size, config: &GeometryConfig, edges: &mut Edges) {
    let tol = config.edge_tolerance_px;
    let at_zero = |v: Option<f32>| v.is_some_and(|v| v.abs() <= tol);
    let full = |v: Option<f32>, extent: f32| v.is_some_and(|v| v >= extent - tol);
    let thin_axis = |v: Option<f32>| v.is_some_and(|v| thin(v, config));

    let horizontal = paint.horizontal && full(p.width, viewport.width) && thin_axis(p.height);
    let vertical = paint.vertical && full(p.height, viewport.height) && thin_axis(p.width);

    if horizontal && at_zero(p.top) && (at_zero(p.left) || at_zero(p.right)) {
        edges.top = true;
    }
    if horizontal && at_zero(p.bottom) && (at_zero(p.left) || at_zero(p.right)) {
        edges.bottom = true;
    }
    if vertical && at_zero(p.left) && (at_zero(p.top) || at_zero(p.bottom)) {
        edges.left = true;
    }
    if vertical && at_zero(p.right) && (at_zero(p.top) || at_zero(p.bottom)) {
        edges.right = true;
    }
}

fn box_border_edges(el: &ElementSnapshot, viewport: Size, config: &GeometryConfig, edges: &mut Edges) {
    let tol = config.edge_tolerance_px;
    let r = el.rect;
    let hugs = r.x.abs() <= tol
        && r.y.abs() <= tol
        && (r.right() - viewport.width).abs() <= tol
        && (r.bottom() - viewport.height).abs() <= tol;
    if !hugs {
        return;
    }
    for side in Side::ALL {
        if let Some(border) = side_border(el, side) {
            if border.visible && thin(border.width, config) {
                side.set(edges);
            }
        }
    }
}

fn has_paint(el: &ElementSnapshot) -> bool {
    el.style("background-color").is_some_and(is_visible_color)
        || el
            .style("background")
            .is_some_and(|v| !v.eq_ignore_ascii_case("none") && is_visible_color(v))
}

fn has_any_border(el: &ElementSnapshot) -> bool {
    Side::ALL
        .into_iter()
        .any(|side| side_border(el, side).is_some_and(|b| b.visible && b.width > 0.0))
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SideBorder {
    width: f32,
    drawn: bool,
    visible: bool,
}

// Space a side's border takes up, whatever its color.
fn border_px(el: &ElementSnapshot, side: Side) -> f32 {
    side_border(el, side).filter(|b| b.drawn).map_or(0.0, |b| b.width)
}

fn box_value(value: &str, side: Side) -> Option<&str> {
    let tokens = tokenize_value(value);
    tokens.get(side.box_index(tokens.len())?).copied()
}

#[derive(Default)]
struct BorderParts<'a> {
    width: Option<&'a str>,
    style: Option<&'a str>,
    color: Option<&'a str>,
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
];

fn split_border_shorthand(value: &str) -> BorderParts<'_> {
    let mut parts = BorderParts::default();
    for token in tokenize_value(value) {
        if parse_length(token).is_some() || parse_offset(token).is_some() {
            parts.width = Some(token);
        } else if BORDER_STYLES.iter().any(|s| token.eq_ignore_ascii_case(s)) {
            parts.style = Some(token);
        } else {
            parts.color = Some(token);
        }
    }
    parts
}

fn side_border(el: &ElementSnapshot, side: Side) -> Option<SideBorder> {
    let n = side.name();
    let side_short = el.style(&format!("border-{n}")).map(split_border_shorthand);
    let all_short = el.style("border").map(split_border_shorthand);

    let width = el
        .style(&format!("border-{n}-width"))
        .or_else(|| side_short.as_ref().and_then(|p| p.width))
        .or_else(|| el.style("border-width").and_then(|v| box_value(v, side)))
        .or_else(|| all_short.as_ref().and_then(|p| p.width))?;
    let width = parse_length(width).map(|l| l.px()).unwrap_or(0.0);

    let style = el
        .style(&format!("border-{n}-style"))
        .or_else(|| side_short.as_ref().and_then(|p| p.style))
        .or_else(|| el.style("border-style").and_then(|v| box_value(v, side)))
        .or_else(|| all_short.as_ref().and_then(|p| p.style));
    let color = el
        .style(&format!("border-{n}-color"))
        .or_else(|| side_short.as_ref().and_then(|p| p.color))
        .or_else(|| el.style("border-color").and_then(|v| box_value(v, side)))
        .or_else(|| all_short.as_ref().and_then(|p| p.color));

    let drawn = style.is_some_and(|s| !s.eq_ignore_ascii_case("none") && !s.eq_ignore_ascii_case("hidden"));
    // no color means currentcolor
    let visible = drawn && color.is_none_or(is_visible_color);
    Some(SideBorder { width, drawn, visible })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ElementRef;

    struct Doc {
        viewport: Size,
        elements: Vec<ElementSnapshot>,
    }

    impl DocumentView for Doc {
        fn viewport(&self) -> Size {
            self.viewport
        }

        fn elements(&self, limit: usize) -> Vec<ElementSnapshot> {
            self.elements.iter().take(limit).cloned().collect()
        }

        fn style_sheets(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn div(id: u64, rect: Rectangle) -> ElementSnapshot {
        ElementSnapshot::new(ElementRef::new(id, "div"), rect)
    }

    fn doc(elements: Vec<ElementSnapshot>) -> Doc {
        Doc {
            viewport: Size::new(300.0, 250.0),
            elements,
        }
    }

    #[test]
    fn positioned_bars_count_per_side() {
        let top = div(1, Rectangle::default())
            .with_inline("position", "absolute")
            .with_inline("top", "0")
            .with_inline("left", "0")
            .with_inline("width", "100%")
            .with_inline("height", "1px")
            .with_inline("background-color", "#000");
        let left = div(2, Rectangle::default())
            .with_computed("position", "fixed")
            .with_computed("top", "0px")
            .with_computed("left", "0px")
            .with_computed("width", "2px")
            .with_computed("height", "250px")
            .with_computed("background-color", "rgb(0, 0, 0)");
        let edges = scan_dom(&doc(vec![top, left]), &GeometryConfig::default());
        assert_eq!(
            edges,
            Edges {
                top: true,
                left: true,
                ..Edges::default()
            }
        );
    }

    #[test]
    fn transparent_bars_do_not_count() {
        let bar = div(1, Rectangle::new(0.0, 0.0, 300.0, 1.0))
            .with_computed("position", "absolute")
            .with_computed("top", "0px")
            .with_computed("left", "0px")
            .with_computed("background-color", "rgba(0, 0, 0, 0)");
        assert_eq!(scan_dom(&doc(vec![bar]), &GeometryConfig::default()).count(), 0);
    }

    #[test]
    fn viewport_box_with_borders_counts_each_side() {
        let frame = div(1, Rectangle::new(0.0, 0.0, 300.0, 250.0))
            .with_inline("border", "1px solid #999")
            .with_inline("border-bottom-style", "none");
        let edges = scan_dom(&doc(vec![frame]), &GeometryConfig::default());
        assert_eq!(edges.count(), 3);
        assert!(!edges.bottom);
    }

    #[test]
    fn rect_pass_catches_static_bars() {
        let bottom = div(1, Rectangle::new(0.0, 246.0, 300.0, 4.0)).with_computed("background-color", "red");
        let edges = scan_dom(&doc(vec![bottom]), &GeometryConfig::default());
        assert!(edges.bottom);
        assert_eq!(edges.count(), 1);
    }

    #[test]
    fn border_colored_bars_count() {
        let bar = div(1, Rectangle::new(0.0, 0.0, 300.0, 2.0))
            .with_computed("position", "absolute")
            .with_computed("top", "0px")
            .with_computed("left", "0px")
            .with_computed("width", "300px")
            .with_computed("height", "0px")
            .with_computed("border-top", "2px solid #000");
        let edges = scan_dom(&doc(vec![bar.clone()]), &GeometryConfig::default());
        assert!(edges.top);
        assert_eq!(edges.count(), 1);

        // the declared offsets alone are enough
        let unmeasured = ElementSnapshot { rect: Rectangle::default(), ..bar };
        assert!(scan_dom(&doc(vec![unmeasured]), &GeometryConfig::default()).top);
    }

    #[test]
    fn side_border_on_the_long_axis_is_not_a_bar() {
        let bar = div(1, Rectangle::new(0.0, 0.0, 300.0, 2.0)).with_computed("border-left", "2px solid #000");
        assert_eq!(scan_dom(&doc(vec![bar]), &GeometryConfig::default()).count(), 0);
    }

    fn framed(width: &str) -> ElementSnapshot {
        div(1, Rectangle::new(0.0, 0.0, 300.0, 250.0))
            .with_computed("border-style", "solid")
            .with_computed("border-color", "#000")
            .with_computed("border-width", width)
    }

    #[test]
    fn two_value_border_width_splits_vertical_and_horizontal() {
        let edges = scan_dom(&doc(vec![framed("4px 0")]), &GeometryConfig::default());
        assert_eq!(
            edges,
            Edges {
                top: true,
                bottom: true,
                ..Edges::default()
            }
        );
    }

    #[test]
    fn four_value_border_width_reaches_the_left_side() {
        let edges = scan_dom(&doc(vec![framed("0 0 0 4px")]), &GeometryConfig::default());
        assert_eq!(
            edges,
            Edges {
                left: true,
                ..Edges::default()
            }
        );
    }

    #[test]
    fn three_value_border_color_hides_the_bottom() {
        let frame = framed("2px").with_computed("border-color", "#000 #000 transparent");
        let edges = scan_dom(&doc(vec![frame]), &GeometryConfig::default());
        assert_eq!(edges.count(), 3);
        assert!(!edges.bottom);
    }

    #[test]
    fn counts_border_rules() {
        let sheets = vec![
            ".a { border: 1px solid red } .b { color: red }".to_string(),
            "@media screen { .c { outline: 1px solid } .d { border-radius: 4px } }".to_string(),
        ];
        assert_eq!(count_border_rules(&sheets), 2);
    }
}
