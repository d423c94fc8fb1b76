//! Host document model
//!
//! The runtime only cares about one part of the page: its `<style>`
//! containers, in document order. [`HostDocument`] keeps exactly that, with
//! ordered attributes and the raw CSS text of each container, plus a fast
//! byte-level scanner to lift the containers out of server-rendered HTML.

use std::sync::{Arc, Mutex};

use memchr::memchr2_iter;

/// Document shared between a sheet's [`HostTarget`](crate::core::HostTarget)
/// and the code that renders or inspects the page.
pub type SharedDocument = Arc<Mutex<HostDocument>>;

/// Stable handle for a container. Unlike a position it survives other
/// containers being added or removed around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

/// One `<style>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleContainer {
    id: ContainerId,
    attributes: Vec<(String, String)>,
    css: String,
}

impl StyleContainer {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Value of an attribute. Boolean attributes have an empty value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub(crate) fn set_css(&mut self, css: String) {
        self.css = css;
    }
}

#[derive(Debug, Default, Clone)]
pub struct HostDocument {
    containers: Vec<StyleContainer>,
    next_id: u64,
}

impl HostDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the document for sharing with a sheet.
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    /// Append a `<style>` container and return its handle.
    pub fn push_style<K, V>(&mut self, attributes: impl IntoIterator<Item = (K, V)>, css: impl Into<String>) -> ContainerId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        self.containers.push(StyleContainer {
            id,
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            css: css.into(),
        });
        id
    }

    pub fn containers(&self) -> &[StyleContainer] {
        &self.containers
    }

    pub fn container(&self, id: ContainerId) -> Option<&StyleContainer> {
        self.containers.iter().find(|c| c.id == id)
    }

    pub(crate) fn container_mut(&mut self, id: ContainerId) -> Option<&mut StyleContainer> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    /// Remove a container, returning it if it was present.
    pub fn remove(&mut self, id: ContainerId) -> Option<StyleContainer> {
        let pos = self.containers.iter().position(|c| c.id == id)?;
        Some(self.containers.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Extract every `<style>` element from an HTML string, in order.
    ///
    /// Everything outside `<style>` elements is ignored. Unterminated
    /// elements are dropped rather than guessed at.
    pub fn parse_html(html: &str) -> Self {
        let mut doc = Self::new();
        for (attributes, css) in iter_style_elements(html) {
            doc.push_style(attributes, css);
        }
        doc
    }

    /// Render the containers back to `<style>` markup, one per line.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (i, container) in self.containers.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            render_style_element(&mut out, &container.attributes, &container.css);
        }
        out
    }
}

/// Append one `<style ...>css</style>` element to `out`. A `</style` inside
/// the CSS is escaped.
pub(crate) fn render_style_element(out: &mut String, attributes: &[(String, String)], css: &str) {
    out.push_str("<style");
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
    push_escaped_css(out, css);
    out.push_str("</style>");
}

/// Case-insensitive search for an ASCII needle starting at `from`.
fn find_ascii_ci(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    let (&first, rest) = needle.split_first()?;
    let haystack = bytes.get(from..)?;
    memchr2_iter(first.to_ascii_lowercase(), first.to_ascii_uppercase(), haystack)
        .map(|offset| from + offset)
        .find(|&i| {
            bytes
                .get(i + 1..i + needle.len())
                .is_some_and(|window| window.eq_ignore_ascii_case(rest))
        })
}

/// Append `css` with every `</style` written as `<\/style`, so rule text
/// cannot close its element. CSS reads `\/` as `/`.
fn push_escaped_css(out: &mut String, css: &str) {
    let bytes = css.as_bytes();
    let mut copied = 0usize;
    while let Some(pos) = find_ascii_ci(bytes, copied, b"</style") {
        out.push_str(&css[copied..=pos]);
        out.push('\\');
        copied = pos + 1;
    }
    out.push_str(&css[copied..]);
}

/// Find `<style ...>...</style>` elements.
///
/// Returns tuples of:
/// - the ordered attribute list (boolean attributes get an empty value)
/// - the raw element text
fn iter_style_elements(html: &str) -> Vec<(Vec<(String, String)>, String)> {
    let mut out = Vec::new();
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while let Some(start) = find_ascii_ci(bytes, i, b"<style") {
        let mut j = start + 6;
        // `<styles>` or `<style-x>` are different elements
        if j < bytes.len() && !(bytes[j].is_ascii_whitespace() || bytes[j] == b'>' || bytes[j] == b'/') {
            i = j;
            continue;
        }

        let mut attributes = Vec::new();
        loop {
            while j < bytes.len() && (bytes[j].is_ascii_whitespace() || bytes[j] == b'/') {
                j += 1;
            }
            if j >= bytes.len() || bytes[j] == b'>' {
                break;
            }
            let name_start = j;
            while j < bytes.len()
                && !bytes[j].is_ascii_whitespace()
                && bytes[j] != b'='
                && bytes[j] != b'>'
                && bytes[j] != b'/'
            {
                j += 1;
            }
            let name = String::from_utf8_lossy(&bytes[name_start..j]).to_string();
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let mut value = String::new();
            if j < bytes.len() && bytes[j] == b'=' {
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'"' || bytes[j] == b'\'') {
                    let quote = bytes[j];
                    let val_start = j + 1;
                    let mut val_end = val_start;
                    while val_end < bytes.len() && bytes[val_end] != quote {
                        val_end += 1;
                    }
                    value = String::from_utf8_lossy(&bytes[val_start..val_end.min(bytes.len())])
                        .replace("&quot;", "\"");
                    j = (val_end + 1).min(bytes.len());
                } else {
                    let val_start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    value = String::from_utf8_lossy(&bytes[val_start..j]).to_string();
                }
            }
            if !name.is_empty() {
                attributes.push((name, value));
            }
        }

        if j >= bytes.len() {
            break;
        }
        let body_start = j + 1;
        let Some(close) = find_ascii_ci(bytes, body_start, b"</style") else {
            break;
        };
        let css = String::from_utf8_lossy(&bytes[body_start..close]).to_string();
        out.push((attributes, css));

        i = match bytes[close..].iter().position(|b| *b == b'>') {
            Some(offset) => close + offset + 1,
            None => bytes.len(),
        };
    }
    out
}
