use std::borrow::Cow;

/// Replace the argument of every `url(...)` token for which `resolve`
/// returns a replacement. Tokens that do not resolve are left exactly as
/// written, quotes included.
pub fn rewrite_urls<'a, F>(css: &'a str, mut resolve: F) -> Cow<'a, str>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::new();
    let mut copied_to = 0usize;
    let mut search_from = 0usize;
    let lower = css.to_ascii_lowercase();

    while let Some(rel) = lower[search_from..].find("url(") {
        let open = search_from + rel + 4;
        let Some(token) = scan_url_argument(css, open) else {
            break;
        };
        search_from = token.end;

        let Some(replacement) = resolve(token.value) else {
            continue;
        };

        out.push_str(&css[copied_to..open]);
        match token.quote {
            Some(q) => {
                out.push(q);
                out.push_str(&replacement);
                out.push(q);
            }
            None => out.push_str(&replacement),
        }
        out.push(')');
        copied_to = token.end;
    }

    if copied_to == 0 {
        return Cow::Borrowed(css);
    }
    out.push_str(&css[copied_to..]);
    Cow::Owned(out)
}

struct UrlToken<'a> {
    value: &'a str,
    quote: Option<char>,
    // byte index just past the closing `)`
    end: usize,
}

fn scan_url_argument(css: &str, open: usize) -> Option<UrlToken<'_>> {
    let rest = &css[open..];
    let trimmed = rest.trim_start();
    let lead = rest.len() - trimmed.len();

    let first = trimmed.chars().next()?;
    if first == '"' || first == '\'' {
        let body_start = open + lead + 1;
        let close_quote = css[body_start..].find(first)? + body_start;
        let close_paren = css[close_quote..].find(')')? + close_quote;
        return Some(UrlToken {
            value: &css[body_start..close_quote],
            quote: Some(first),
            end: close_paren + 1,
        });
    }

    let close_paren = css[open..].find(')')? + open;
    Some(UrlToken {
        value: css[open..close_paren].trim(),
        quote: None,
        end: close_paren + 1,
    })
}
