//! Animation bounds: longest declared duration, most loops, and whether
//! anything loops forever.
//!
//! Sources are sampled, not watched: computed styles at each scheduled
//! scan, style writes as they happen, and tween construction in hooked
//! timeline libraries. Every source only raises the maxima.

use std::cell::RefCell;

use core_types::Summary;
use css::{AnimationLayer, Iterations};

use crate::capability::globals::{DurationUnit, Globals, RepeatSpec, TimelineLibrary, TweenParams};
use crate::capability::view::{DocumentView, ElementSnapshot};
use crate::context::MonitorContext;
use crate::error::MonitorError;

const SHORTHAND: &[&str] = &["animation", "-webkit-animation"];
const DURATION: &[&str] = &["animation-duration", "-webkit-animation-duration"];
const ITERATIONS: &[&str] = &["animation-iteration-count", "-webkit-animation-iteration-count"];

fn fold_layers(summary: &mut Summary, layers: &[AnimationLayer], sentinel: u32) {
    for layer in layers {
        summary.raise_animation_ms(layer.duration_ms);
        match layer.iterations {
            Iterations::Infinite => summary.mark_infinite_animation(sentinel),
            // a zero-length animation never plays, however often it loops
            Iterations::Count(n) if layer.duration_ms > 0.0 => {
                summary.raise_animation_loops(n.ceil().min(f64::from(u32::MAX)) as u32);
            }
            Iterations::Count(_) => {}
        }
    }
}

/// Fold a batch of `name: value` style declarations. Only `animation*`
/// properties matter; anything else is ignored.
pub fn fold_declarations<'a>(
    ctx: &MonitorContext,
    decls: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), MonitorError> {
    let mut shorthand = Vec::new();
    let mut duration = None;
    let mut iterations = None;
    for (name, value) in decls {
        let name = name.trim().to_ascii_lowercase();
        if SHORTHAND.contains(&name.as_str()) {
            shorthand.push(value);
        } else if DURATION.contains(&name.as_str()) {
            duration = Some(value);
        } else if ITERATIONS.contains(&name.as_str()) {
            iterations = Some(value);
        }
    }
    if shorthand.is_empty() && duration.is_none() && iterations.is_none() {
        return Ok(());
    }

    let mut layers = css::animation::parse_longhands(duration, iterations);
    for value in shorthand {
        layers.extend(css::parse_shorthand(value));
    }
    let sentinel = ctx.config().animation.infinite_loop_sentinel;
    ctx.update(|s| fold_layers(s, &layers, sentinel))
}

fn first_style<'a>(el: &'a ElementSnapshot, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| el.style(n))
}

/// One pass over the document's computed animation styles.
pub fn scan(ctx: &MonitorContext, view: &dyn DocumentView) -> Result<usize, MonitorError> {
    let config = &ctx.config().animation;
    let elements = view.elements(config.max_elements);
    let mut layers = Vec::new();
    for el in &elements {
        layers.extend(css::parse_animation(
            first_style(el, SHORTHAND),
            first_style(el, DURATION),
            first_style(el, ITERATIONS),
        ));
    }
    let sentinel = config.infinite_loop_sentinel;
    ctx.update(|s| fold_layers(s, &layers, sentinel))?;
    log::trace!(
        target: "monitor.animation",
        "scanned {} elements, {} layers",
        elements.len(),
        layers.len()
    );
    Ok(layers.len())
}

/// Hook every configured timeline library present and not yet hooked.
/// Returns how many were hooked by this call.
pub fn hook_libraries(ctx: &MonitorContext, globals: &RefCell<Globals>) -> Result<usize, MonitorError> {
    let mut globals = globals
        .try_borrow_mut()
        .map_err(|_| MonitorError::Hook("globals are busy".into()))?;
    let mut hooked = 0;
    for name in &ctx.config().animation.library_names {
        if !globals.has_library(name) {
            continue;
        }
        if globals.hook_library(name, |original| HookedLibrary::wrap(original, ctx.clone())) {
            log::debug!(target: "monitor.animation", "hooked timeline library {name}");
            hooked += 1;
        }
        ctx.update(|s| s.known_library = Some(true))?;
    }
    Ok(hooked)
}

/// Reads declared durations off tween and timeline construction.
pub struct HookedLibrary {
    inner: Box<dyn TimelineLibrary>,
    ctx: MonitorContext,
}

impl HookedLibrary {
    pub fn wrap(original: Box<dyn TimelineLibrary>, ctx: MonitorContext) -> Box<dyn TimelineLibrary> {
        Box::new(Self { inner: original, ctx })
    }

    fn fold(&self, params: &TweenParams) {
        let ms = self.inner.unit().to_ms(params.duration);
        self.ctx.observe("animation.tween", |ctx| {
            let iterations = match params.repeat {
                RepeatSpec::Once => Iterations::Count(1.0),
                RepeatSpec::Times(n) => Iterations::Count(f64::from(n)),
                RepeatSpec::Forever => Iterations::Infinite,
            };
            let layer = AnimationLayer {
                duration_ms: ms,
                iterations,
            };
            let sentinel = ctx.config().animation.infinite_loop_sentinel;
            ctx.update(|s| fold_layers(s, &[layer], sentinel))
        });
    }
}

impl TimelineLibrary for HookedLibrary {
    fn unit(&self) -> DurationUnit {
        self.inner.unit()
    }

    fn tween(&mut self, target: &str, params: &TweenParams) {
        self.fold(params);
        self.inner.tween(target, params);
    }

    fn timeline(&mut self, params: &TweenParams) {
        self.fold(params);
        self.inner.timeline(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(ms: f64, iterations: Iterations) -> AnimationLayer {
        AnimationLayer {
            duration_ms: ms,
            iterations,
        }
    }

    #[test]
    fn maxima_only_rise() {
        let mut s = Summary::default();
        for ms in [1000.0, 3000.0, 2000.0] {
            fold_layers(&mut s, &[layer(ms, Iterations::Count(2.0))], 999);
        }
        assert_eq!(s.max_animation_ms, Some(3000.0));
        assert_eq!(s.max_animation_loops, Some(2));
    }

    #[test]
    fn infinite_sticks_and_forces_sentinel() {
        let mut s = Summary::default();
        fold_layers(&mut s, &[layer(500.0, Iterations::Infinite)], 999);
        fold_layers(&mut s, &[layer(500.0, Iterations::Count(3.0))], 999);
        assert_eq!(s.infinite_animation, Some(true));
        assert_eq!(s.max_animation_loops, Some(999));
    }

    #[test]
    fn zero_length_layers_do_not_count_loops() {
        let mut s = Summary::default();
        fold_layers(&mut s, &[layer(0.0, Iterations::Count(5.0))], 999);
        assert_eq!(s.max_animation_loops, None);
        assert_eq!(s.max_animation_ms, Some(0.0));
    }
}
