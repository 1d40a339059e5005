use core_types::Rgba;

/// CSS Length value, currently only supports `px`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Px(f32),
}

impl Length {
    pub fn px(self) -> f32 {
        let Length::Px(px) = self;
        px
    }
}

/// CSS `position` value, only the variants the geometry pass cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    /// Out-of-flow boxes, positioned against the viewport or a container.
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Position::Absolute | Position::Fixed)
    }
}

pub fn parse_position(value: &str) -> Option<Position> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "static" => Some(Position::Static),
        "relative" => Some(Position::Relative),
        "absolute" => Some(Position::Absolute),
        "fixed" => Some(Position::Fixed),
        "sticky" => Some(Position::Sticky),
        _ => None,
    }
}

pub fn parse_color(value: &str) -> Option<Rgba> {
    let s = value.trim().to_ascii_lowercase();
    // HEX
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    if let Some(args) = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }

    let named = match s.as_str() {
        "transparent" => (0, 0, 0, 0),
        "black" => (0, 0, 0, 255),
        "blue" => (0, 0, 255, 255),
        "cyan" | "aqua" => (0, 255, 255, 255),
        "gray" | "grey" => (128, 128, 128, 255),
        "green" => (0, 128, 0, 255),
        "lime" => (0, 255, 0, 255),
        "magenta" | "fuchsia" => (255, 0, 255, 255),
        "maroon" => (128, 0, 0, 255),
        "navy" => (0, 0, 128, 255),
        "olive" => (128, 128, 0, 255),
        "orange" => (255, 165, 0, 255),
        "purple" => (128, 0, 128, 255),
        "red" => (255, 0, 0, 255),
        "silver" => (192, 192, 192, 255),
        "teal" => (0, 128, 128, 255),
        "white" => (255, 255, 255, 255),
        "yellow" => (255, 255, 0, 255),
        _ => return None,
    };
    Some(named)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1].repeat(2), 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => Some((nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some((nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some((byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some((byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

// "255, 0, 0" | "255 0 0 / 0.5" | "255,0,0,0.5"
fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        let v = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? * 2.55,
            None => p.parse::<f32>().ok()?,
        };
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match parts.get(3) {
        Some(p) => {
            let a = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()?,
            };
            (a.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Some((
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

/// A color that would actually put pixels on screen. Unparseable values
/// (gradients, `currentcolor`, patterns) count as visible.
pub fn is_visible_color(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") {
        return false;
    }
    match parse_color(v) {
        Some((_, _, _, a)) => a > 0,
        None => true,
    }
}

/// Parse a positive `NNpx` value into a Length.
pub fn parse_length(value: &str) -> Option<Length> {
    let v = value.trim();

    if let Some(px_str) = v.strip_suffix("px") {
        let num = px_str.trim().parse::<f32>().ok()?;
        if num.is_finite() && num > 0.0 {
            return Some(Length::Px(num));
        }
    }
    None
}

/// Parse an offset (`top`, `left`, ...). Unlike `parse_length` this admits
/// zero, negative values and the unitless `0`.
pub fn parse_offset(value: &str) -> Option<f32> {
    let v = value.trim();
    let num = match v.strip_suffix("px") {
        Some(px) => px.trim().parse::<f32>().ok()?,
        None => {
            let n = v.parse::<f32>().ok()?;
            if n != 0.0 {
                return None;
            }
            n
        }
    };
    num.is_finite().then_some(num)
}

/// Percentage value as a fraction, `"100%"` -> `1.0`.
pub fn parse_percentage(value: &str) -> Option<f32> {
    let pct = value.trim().strip_suffix('%')?.trim().parse::<f32>().ok()?;
    pct.is_finite().then_some(pct / 100.0)
}
