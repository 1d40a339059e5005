// A single CSS property: "color: red"
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

// Selector text and declarations of one style rule
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl Rule {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

// A full stylesheet: multiple rules
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

// input: "div, #id { color: red; } @media (x) { .a { top: 0 } }"
// output: Stylesheet with the style rules, conditional group bodies flattened.
// `@keyframes`, `@font-face` and friends are skipped.
pub fn parse_stylesheet(input: &str) -> Stylesheet {
    let text = strip_comments(input);
    let mut rules = Vec::new();
    collect_rules(&text, &mut rules);
    Stylesheet { rules }
}

fn collect_rules(input: &str, out: &mut Vec<Rule>) {
    let mut depth = 0usize;
    let mut prelude_start = 0usize;
    let mut body_start = 0usize;

    for (i, ch) in input.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    body_start = i + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    prelude_start = i + 1;
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    let prelude = input[prelude_start..body_start - 1].trim();
                    let body = &input[body_start..i];
                    push_block(prelude, body, out);
                    prelude_start = i + 1;
                }
            }
            ';' if depth == 0 => {
                // statement at-rules: @import, @charset
                prelude_start = i + 1;
            }
            _ => {}
        }
    }
}

fn push_block(prelude: &str, body: &str, out: &mut Vec<Rule>) {
    if let Some(at) = prelude.strip_prefix('@') {
        let keyword = at
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if matches!(keyword.as_str(), "media" | "supports" | "document" | "layer") {
            collect_rules(body, out);
        }
        return;
    }

    let selectors = prelude
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if selectors.is_empty() {
        return;
    }
    let declarations = parse_declarations(body);
    if declarations.is_empty() {
        return;
    }
    out.push(Rule {
        selectors,
        declarations,
    });
}

// input: "color: red; font-size: 12px;"
// output: vec![Declaration { name: "color", value: "red" }, Declaration { name: "font-size", value: "12px" }]
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    input
        .split(';')
        .filter_map(|pair| {
            let (n, v) = pair.split_once(':')?;
            let name = n.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            let value = v.trim().trim_end_matches("!important").trim().to_string();
            Some(Declaration { name, value })
        })
        .collect()
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Split a value on top-level commas, leaving commas inside parentheses
/// (`cubic-bezier(0, 0, 1, 1)`) alone.
pub fn split_top_level_commas(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts
}

/// Split a layer into whitespace-separated tokens, keeping function
/// arguments together.
pub fn tokenize_value(layer: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, ch) in layer.char_indices() {
        match ch {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&layer[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&layer[s..]);
    }
    tokens
}
