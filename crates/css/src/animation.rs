//! `animation` timing values: durations, iteration counts, and the
//! shorthand form tokenized back into per-layer pairs.

use crate::syntax::{split_top_level_commas, tokenize_value};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Iterations {
    Count(f64),
    Infinite,
}

/// One comma-separated layer of an element's animations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationLayer {
    pub duration_ms: f64,
    pub iterations: Iterations,
}

/// `"1.5s"` -> 1500, `"300ms"` -> 300.
pub fn parse_time(token: &str) -> Option<f64> {
    let t = token.trim().to_ascii_lowercase();
    let ms = if let Some(ms) = t.strip_suffix("ms") {
        ms.parse::<f64>().ok()?
    } else if let Some(s) = t.strip_suffix('s') {
        s.parse::<f64>().ok()? * 1000.0
    } else {
        return None;
    };
    (ms.is_finite() && ms >= 0.0).then_some(ms)
}

pub fn parse_iteration_count(token: &str) -> Option<Iterations> {
    let t = token.trim();
    if t.eq_ignore_ascii_case("infinite") {
        return Some(Iterations::Infinite);
    }
    let n = t.parse::<f64>().ok()?;
    (n.is_finite() && n >= 0.0).then_some(Iterations::Count(n))
}

/// Pair `animation-duration` with `animation-iteration-count`. The shorter
/// list repeats, the way the cascade repeats animation lists.
pub fn parse_longhands(duration: Option<&str>, iterations: Option<&str>) -> Vec<AnimationLayer> {
    let durations: Vec<f64> = duration
        .map(|v| split_top_level_commas(v).into_iter().filter_map(parse_time).collect())
        .unwrap_or_default();
    let counts: Vec<Iterations> = iterations
        .map(|v| {
            split_top_level_commas(v)
                .into_iter()
                .filter_map(parse_iteration_count)
                .collect()
        })
        .unwrap_or_default();

    let n = durations.len().max(counts.len());
    (0..n)
        .map(|i| AnimationLayer {
            duration_ms: if durations.is_empty() {
                0.0
            } else {
                durations[i % durations.len()]
            },
            iterations: if counts.is_empty() {
                Iterations::Count(1.0)
            } else {
                counts[i % counts.len()]
            },
        })
        .collect()
}

/// `animation: spin 2s linear 1s infinite, fade 500ms 3`
///
/// The first time value in a layer is its duration, the second its delay.
/// A bare number is the iteration count.
pub fn parse_shorthand(value: &str) -> Vec<AnimationLayer> {
    split_top_level_commas(value)
        .into_iter()
        .filter(|layer| !layer.is_empty() && !layer.eq_ignore_ascii_case("none"))
        .map(|layer| {
            let mut duration_ms = None;
            let mut iterations = None;
            for token in tokenize_value(layer) {
                if let Some(ms) = parse_time(token) {
                    if duration_ms.is_none() {
                        duration_ms = Some(ms);
                    }
                    continue;
                }
                if iterations.is_none() {
                    iterations = parse_iteration_count(token);
                }
            }
            AnimationLayer {
                duration_ms: duration_ms.unwrap_or(0.0),
                iterations: iterations.unwrap_or(Iterations::Count(1.0)),
            }
        })
        .collect()
}

/// Every layer an element declares through either form.
pub fn parse_animation(
    shorthand: Option<&str>,
    duration: Option<&str>,
    iterations: Option<&str>,
) -> Vec<AnimationLayer> {
    let mut layers = parse_longhands(duration, iterations);
    if let Some(value) = shorthand {
        layers.extend(parse_shorthand(value));
    }
    layers
}
