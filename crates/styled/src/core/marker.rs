//! Marker rule codec
//!
//! Every group ends with a zero-effect rule carrying its metadata:
//!
//! ```text
//! data-styled.g1[id="TWO"]{content:"b,c,"}
//! ```
//!
//! The selector is the marking attribute name followed by `.g<group>` and an
//! `[id="..."]` attribute selector; the `content` value lists the names
//! emitted for the group, each terminated by a comma. This text is the wire
//! format for rehydration, so [`MarkerCodec::encode`] and
//! [`MarkerCodec::decode`] must stay exact inverses.

/// Decoded marker rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub group: usize,
    pub id: String,
    pub names: Vec<String>,
}

/// Exclusive upper bound on group indices. Markers claiming a larger index
/// are not decoded, so their rules stay unindexed instead of forcing the tag
/// to allocate a slot for every index below them.
pub const MAX_GROUP: usize = 1 << 20;

/// Characters that cannot appear in an owning id without breaking the marker.
const FORBIDDEN_ID_CHARS: &[char] = &['"', ']', '[', '{', '}', '\\'];

/// Whether `id` can be carried by a marker rule.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| c.is_whitespace() || FORBIDDEN_ID_CHARS.contains(&c))
}

/// Whether `name` can be carried in a marker's content list.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c == ',' || c == '"' || c == '\\' || c.is_whitespace())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerCodec {
    selector: String,
}

impl MarkerCodec {
    /// `selector` is the marking attribute, e.g. `data-styled`.
    pub fn new(selector: impl Into<String>) -> Self {
        Self { selector: selector.into() }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn encode<S: AsRef<str>>(&self, group: usize, id: &str, names: impl IntoIterator<Item = S>) -> String {
        let mut content = String::new();
        for name in names {
            content.push_str(name.as_ref());
            content.push(',');
        }
        format!("{}.g{}[id=\"{}\"]{{content:\"{}\"}}", self.selector, group, id, content)
    }

    /// Decode a single rule. Anything that is not exactly a marker for this
    /// codec's selector yields `None`.
    pub fn decode(&self, rule: &str) -> Option<Marker> {
        let rest = rule.trim().strip_prefix(self.selector.as_str())?.strip_prefix(".g")?;

        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let group: usize = rest[..digits].parse().ok()?;
        if group >= MAX_GROUP {
            return None;
        }

        let rest = rest[digits..].strip_prefix("[id=\"")?;
        let (id, rest) = rest.split_once("\"]")?;
        if !is_valid_id(id) {
            return None;
        }

        let rest = rest.trim_start().strip_prefix('{')?;
        let rest = rest.trim_start().strip_prefix("content")?;
        let rest = rest.trim_start().strip_prefix(':')?;
        let rest = rest.trim_start().strip_prefix('"')?;
        let (content, rest) = rest.split_once('"')?;
        let rest = rest.trim_start().strip_prefix(';').unwrap_or(rest.trim_start());
        if rest.trim_start().strip_prefix('}')?.trim().is_empty() {
            let names: Vec<String> = content
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
            if !names.iter().all(|n| is_valid_name(n)) {
                return None;
            }
            Some(Marker { group, id: id.to_string(), names })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MarkerCodec {
        MarkerCodec::new("data-styled")
    }

    #[test]
    fn test_encode_format() {
        let rule = codec().encode(1, "TWO", ["b", "c"]);
        assert_eq!(rule, r#"data-styled.g1[id="TWO"]{content:"b,c,"}"#);
    }

    #[test]
    fn test_encode_without_names() {
        let rule = codec().encode(0, "sc-global-abc", Vec::<String>::new());
        assert_eq!(rule, r#"data-styled.g0[id="sc-global-abc"]{content:""}"#);
    }

    #[test]
    fn test_decode_basic() {
        let marker = codec().decode(r#"data-styled.g12[id="Button-xyz"]{content:"a,bC,"}"#).unwrap();
        assert_eq!(marker.group, 12);
        assert_eq!(marker.id, "Button-xyz");
        assert_eq!(marker.names, vec!["a".to_string(), "bC".to_string()]);
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_semicolon() {
        let marker = codec()
            .decode("\n  data-styled.g3[id=\"X\"] { content : \"a,\"; }  ")
            .unwrap();
        assert_eq!(marker.group, 3);
        assert_eq!(marker.names, vec!["a".to_string()]);
    }

    #[test]
    fn test_decode_rejects_non_markers() {
        let c = codec();
        assert!(c.decode(".a{color:red}").is_none());
        assert!(c.decode(r#"data-styled.gx[id="A"]{content:""}"#).is_none());
        assert!(c.decode(r#"data-styled.g1[id=""]{content:""}"#).is_none());
        assert!(c.decode(r#"data-styled.g1[id="A"]{color:red}"#).is_none());
        assert!(c.decode(r#"data-styled.g1[id="A"]{content:"a,"} .b{}"#).is_none());
        assert!(c.decode(r#"other-attr.g1[id="A"]{content:"a,"}"#).is_none());
    }

    #[test]
    fn test_decode_rejects_out_of_range_groups() {
        let c = codec();
        assert!(c.decode(r#"data-styled.g18446744073709551615[id="A"]{content:"a,"}"#).is_none());
        assert!(c.decode(r#"data-styled.g99999999999999999999999[id="A"]{content:"a,"}"#).is_none());
        assert!(c.decode(&c.encode(MAX_GROUP, "A", ["a"])).is_none());
        assert_eq!(c.decode(&c.encode(MAX_GROUP - 1, "A", ["a"])).map(|m| m.group), Some(MAX_GROUP - 1));
    }

    #[test]
    fn test_decode_rejects_unusable_names() {
        let c = codec();
        assert!(c.decode(r#"data-styled.g0[id="A"]{content:"a b,"}"#).is_none());
        assert!(c.decode(r#"data-styled.g0[id="A"]{content:"a\\b,"}"#).is_none());
        assert!(c.decode(r#"data-styled.g0[id="A"]{content:" a , b ,"}"#).is_some());
    }

    #[test]
    fn test_decode_uses_codec_selector() {
        let custom = MarkerCodec::new("data-app-styles");
        let rule = custom.encode(4, "A", ["x"]);
        assert!(codec().decode(&rule).is_none());
        assert_eq!(custom.decode(&rule).map(|m| m.group), Some(4));
    }

    #[test]
    fn test_id_validation() {
        assert!(is_valid_id("sc-keyframes-bcCs"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("quote\"d"));
        assert!(is_valid_name("a"));
        assert!(!is_valid_name("a,b"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn decode_never_panics(input in ".*") {
                let _ = codec().decode(&input);
            }

            #[test]
            fn decode_inverts_encode(
                group in 0usize..MAX_GROUP,
                id in "[A-Za-z][A-Za-z0-9_-]{0,20}",
                names in prop::collection::vec("[a-zA-Z][a-zA-Z-]{0,6}", 0..6),
            ) {
                let c = codec();
                let marker = c.decode(&c.encode(group, &id, &names)).unwrap();
                prop_assert_eq!(marker.group, group);
                prop_assert_eq!(marker.id, id);
                prop_assert_eq!(marker.names, names);
            }
        }
    }
}
