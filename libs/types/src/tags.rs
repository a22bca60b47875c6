//! Message tag encodings
//!
//! Tags arrive in one of three shapes:
//!
//! - JSON object: `{"Action": "Set", "Key": "name"}`
//! - AO tag list: `[{"name": "Action", "value": "Set"}]`
//! - Flattened string: `"Action=Set,Key=name"`
//!
//! All three decode into the same insertion-ordered [`Tags`] map; a later
//! duplicate overwrites an earlier one.
//!
//! ## Flattened Encoding
//!
//! The string is split on unescaped `,` first, then each pair on its first
//! unescaped `=`. A backslash makes the next character literal, so `\,`, `\=`
//! and `\\` can appear inside keys and values. Empty segments are skipped.
//! A pair without `=` is dropped by [`parse_flat_tags`] and rejected by
//! [`parse_flat_tags_strict`].

use indexmap::IndexMap;
use serde::Deserialize;

/// String-to-string tag map in arrival order
pub type Tags = IndexMap<String, String>;

/// One `,`-separated segment of a flattened tag string
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Pair(String, String),
    Bare(String),
}

fn split_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut touched = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Trailing backslash stays literal
                let literal = chars.next().unwrap_or('\\');
                if in_value {
                    value.push(literal);
                } else {
                    key.push(literal);
                }
                touched = true;
            }
            ',' => {
                if touched {
                    segments.push(finish_segment(&mut key, &mut value, in_value));
                }
                in_value = false;
                touched = false;
            }
            '=' if !in_value => {
                in_value = true;
                touched = true;
            }
            other => {
                if in_value {
                    value.push(other);
                } else {
                    key.push(other);
                }
                touched = true;
            }
        }
    }

    if touched {
        segments.push(finish_segment(&mut key, &mut value, in_value));
    }

    segments
}

fn finish_segment(key: &mut String, value: &mut String, in_value: bool) -> Segment {
    let key = std::mem::take(key);
    let value = std::mem::take(value);
    if in_value {
        Segment::Pair(key, value)
    } else {
        Segment::Bare(key)
    }
}

/// Parse a flattened `k1=v1,k2=v2` string, silently dropping pairs without `=`
pub fn parse_flat_tags(input: &str) -> Tags {
    split_segments(input)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Pair(key, value) => Some((key, value)),
            Segment::Bare(_) => None,
        })
        .collect()
}

/// Parse a flattened tag string, returning the first pair that lacks `=`
pub fn parse_flat_tags_strict(input: &str) -> Result<Tags, String> {
    let mut tags = Tags::new();
    for segment in split_segments(input) {
        match segment {
            Segment::Pair(key, value) => {
                tags.insert(key, value);
            }
            Segment::Bare(pair) => return Err(pair),
        }
    }
    Ok(tags)
}

/// Wire shapes accepted for the `Tags` field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TagsRepr {
    Map(IndexMap<String, String>),
    List(Vec<TagEntry>),
    Flat(String),
}

/// Entry of an AO tag list
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagEntry {
    #[serde(alias = "Name")]
    name: String,
    #[serde(alias = "Value")]
    value: String,
}

impl TagsRepr {
    /// Normalize into a [`Tags`] map; `Err` carries a bare flattened pair in strict mode
    pub(crate) fn into_tags(self, strict: bool) -> Result<Tags, String> {
        match self {
            TagsRepr::Map(map) => Ok(map),
            TagsRepr::List(entries) => Ok(entries
                .into_iter()
                .map(|entry| (entry.name, entry.value))
                .collect()),
            TagsRepr::Flat(flat) if strict => parse_flat_tags_strict(&flat),
            TagsRepr::Flat(flat) => Ok(parse_flat_tags(&flat)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_tags_basic() {
        let tags = parse_flat_tags("Action=Set,Key=name");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("Action").map(String::as_str), Some("Set"));
        assert_eq!(tags.get("Key").map(String::as_str), Some("name"));
    }

    #[test]
    fn test_flat_tags_split_on_first_equals() {
        let tags = parse_flat_tags("expr=a=b");
        assert_eq!(tags.get("expr").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_flat_tags_drop_bare_pairs() {
        let tags = parse_flat_tags("Action=Info,garbage,Key=k");
        assert_eq!(tags.len(), 2);
        assert!(!tags.contains_key("garbage"));
    }

    #[test]
    fn test_flat_tags_skip_empty_segments() {
        let tags = parse_flat_tags(",,Action=Info,,");
        assert_eq!(tags.len(), 1);
        assert!(parse_flat_tags("").is_empty());
    }

    #[test]
    fn test_flat_tags_empty_value_is_kept() {
        let tags = parse_flat_tags("Key=");
        assert_eq!(tags.get("Key").map(String::as_str), Some(""));
    }

    #[test]
    fn test_flat_tags_escapes() {
        let tags = parse_flat_tags(r"Greeting=hello\, world,Eq\=Key=1,Slash=a\\b");
        assert_eq!(tags.get("Greeting").map(String::as_str), Some("hello, world"));
        assert_eq!(tags.get("Eq=Key").map(String::as_str), Some("1"));
        assert_eq!(tags.get("Slash").map(String::as_str), Some(r"a\b"));
    }

    #[test]
    fn test_flat_tags_later_duplicate_wins() {
        let tags = parse_flat_tags("Key=a,Key=b");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("Key").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_strict_rejects_bare_pair() {
        assert_eq!(
            parse_flat_tags_strict("Action=Info,oops"),
            Err("oops".to_string())
        );
        assert!(parse_flat_tags_strict("Action=Info").is_ok());
    }

    #[test]
    fn test_repr_list_shape() {
        let repr: TagsRepr =
            serde_json::from_str(r#"[{"name":"Action","value":"Get"},{"Name":"Key","Value":"k"}]"#)
                .unwrap();
        let tags = repr.into_tags(false).unwrap();
        assert_eq!(tags.get("Action").map(String::as_str), Some("Get"));
        assert_eq!(tags.get("Key").map(String::as_str), Some("k"));
    }

    #[test]
    fn test_repr_map_keeps_order() {
        let repr: TagsRepr = serde_json::from_str(r#"{"b":"1","a":"2"}"#).unwrap();
        let tags = repr.into_tags(false).unwrap();
        let keys: Vec<_> = tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
