//! Rule compilation
//!
//! Turning a resolved CSS body into insertable rules belongs to the template
//! compiler, which lives outside this crate. [`RuleCompiler`] is the seam;
//! [`FlatCompiler`] covers plain declarations, `&` nesting and wrapping
//! conditional at-rules, which is what the adapters and tests need.

/// Turns resolved CSS into rule texts for one selector.
pub trait RuleCompiler {
    /// Rules for a component selector such as `.a`.
    fn compile(&self, selector: &str, css: &str) -> Vec<String>;

    /// Rules for a global block, which already carries its own selectors.
    fn compile_global(&self, css: &str) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FlatCompiler;

/// Conditional group rules whose body is compiled against the outer selector.
const WRAPPING_AT_RULES: &[&str] = &["@media", "@supports", "@container", "@layer"];

#[derive(Debug, PartialEq, Eq)]
enum Item<'a> {
    Declaration(&'a str),
    Block { prelude: &'a str, body: &'a str },
}

/// Split `css` into top-level declarations and blocks. Quoted strings are
/// opaque; an unbalanced block swallows the rest of the input.
fn scan_top_level(css: &str) -> Vec<Item<'_>> {
    let bytes = css.as_bytes();
    let mut items = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b';' => {
                let decl = css[start..i].trim();
                if !decl.is_empty() {
                    items.push(Item::Declaration(decl));
                }
                start = i + 1;
            }
            b'{' => {
                let prelude = css[start..i].trim();
                let body_start = i + 1;
                let mut depth = 1usize;
                let mut j = body_start;
                let mut inner_quote: Option<u8> = None;
                while j < bytes.len() && depth > 0 {
                    let c = bytes[j];
                    if let Some(q) = inner_quote {
                        if c == b'\\' {
                            j += 1;
                        } else if c == q {
                            inner_quote = None;
                        }
                    } else {
                        match c {
                            b'"' | b'\'' => inner_quote = Some(c),
                            b'{' => depth += 1,
                            b'}' => depth -= 1,
                            _ => {}
                        }
                    }
                    j += 1;
                }
                let body_end = if depth == 0 { j - 1 } else { bytes.len() };
                items.push(Item::Block {
                    prelude,
                    body: css[body_start..body_end.min(bytes.len())].trim(),
                });
                start = j.min(bytes.len());
                i = start;
                continue;
            }
            b'}' => {
                // stray close brace
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    let rest = css[start.min(css.len())..].trim();
    if !rest.is_empty() {
        items.push(Item::Declaration(rest));
    }
    items
}

fn resolve_selector(parent: &str, nested: &str) -> String {
    nested
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.contains('&') {
                part.replace('&', parent)
            } else {
                format!("{parent} {part}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl RuleCompiler for FlatCompiler {
    fn compile(&self, selector: &str, css: &str) -> Vec<String> {
        let mut declarations = String::new();
        let mut nested = Vec::new();

        for item in scan_top_level(css) {
            match item {
                Item::Declaration(decl) => {
                    declarations.push_str(decl);
                    declarations.push(';');
                }
                Item::Block { prelude, body } if prelude.starts_with('@') => {
                    if WRAPPING_AT_RULES.iter().any(|at| prelude.starts_with(at)) {
                        let inner = self.compile(selector, body).concat();
                        if !inner.is_empty() {
                            nested.push(format!("{prelude}{{{inner}}}"));
                        }
                    } else {
                        nested.push(format!("{prelude}{{{body}}}"));
                    }
                }
                Item::Block { prelude, body } => {
                    nested.extend(self.compile(&resolve_selector(selector, prelude), body));
                }
            }
        }

        let mut rules = Vec::with_capacity(nested.len() + 1);
        if !declarations.is_empty() {
            rules.push(format!("{selector}{{{declarations}}}"));
        }
        rules.extend(nested);
        rules
    }

    fn compile_global(&self, css: &str) -> Vec<String> {
        let mut rules = Vec::new();
        for item in scan_top_level(css) {
            match item {
                Item::Declaration(statement) if statement.starts_with('@') => {
                    rules.push(format!("{statement};"));
                }
                Item::Declaration(decl) => {
                    tracing::debug!(declaration = decl, "Dropping global declaration without a selector");
                }
                Item::Block { prelude, body } => rules.push(format!("{prelude}{{{body}}}")),
            }
        }
        rules
    }
}
