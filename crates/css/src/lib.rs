pub mod animation;
pub mod syntax;
pub mod urls;
pub mod values;

// Re-exports so other crates can just use `css::...` nicely.
pub use animation::{AnimationLayer, Iterations, parse_animation, parse_shorthand, parse_time};
pub use syntax::{Declaration, Rule, Stylesheet, parse_declarations, parse_stylesheet};
pub use urls::rewrite_urls;
pub use values::{
    Length, Position, is_visible_color, parse_color, parse_length, parse_offset,
    parse_percentage, parse_position,
};
