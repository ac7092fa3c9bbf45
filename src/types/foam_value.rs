use indexmap::IndexMap;
use serde::Serialize;

/// Insertion-ordered key/value body of a dictionary or sub-dictionary.
pub type FoamDict = IndexMap<String, FoamValue>;

/// One value of a dictionary entry.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(untagged)]
pub enum FoamValue {
    /// Present in a template but with nothing to write, e.g. an `#include` with no target.
    #[default]
    Unset,
    /// A run of bare tokens (`uniform 0.1`, `Newtonian`, `"quoted"`).
    Token(String),
    /// A `[ ... ]` group such as a dimension set.
    Dimensions(Vec<String>),
    /// A `( ... )` group.
    List(Vec<FoamValue>),
    Dict(FoamDict),
}

impl FoamValue {
    pub fn token(text: impl Into<String>) -> Self {
        FoamValue::Token(text.into())
    }

    pub fn number(value: f64) -> Self {
        FoamValue::Token(format_number(value))
    }

    pub fn dimensions(text: &str) -> Self {
        FoamValue::Dimensions(
            text.trim_matches(|c| c == '[' || c == ']')
                .split_whitespace()
                .map(String::from)
                .collect(),
        )
    }

    pub fn vector(components: [f64; 3]) -> Self {
        FoamValue::List(components.iter().map(|c| FoamValue::number(*c)).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FoamValue::Unset => true,
            FoamValue::Token(text) => text.trim().is_empty(),
            FoamValue::Dimensions(items) => items.is_empty(),
            FoamValue::List(items) => items.is_empty(),
            FoamValue::Dict(dict) => dict.is_empty(),
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            FoamValue::Token(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&FoamDict> {
        match self {
            FoamValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut FoamDict> {
        match self {
            FoamValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Parses a single-token value as a number.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_token().and_then(|t| t.trim().parse().ok())
    }

    /// Inline text of a non-dictionary value, as it appears between the key and `;`.
    pub fn inline_text(&self) -> String {
        match self {
            FoamValue::Unset => String::new(),
            FoamValue::Token(text) => text.clone(),
            FoamValue::Dimensions(items) => format!("[{}]", items.join(" ")),
            FoamValue::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        FoamValue::Dict(dict) => {
                            let body: Vec<String> = dict
                                .iter()
                                .map(|(k, v)| format!("{} {};", k, v.inline_text()))
                                .collect();
                            format!("{{ {} }}", body.join(" "))
                        }
                        other => other.inline_text(),
                    })
                    .collect();
                format!("({})", parts.join(" "))
            }
            FoamValue::Dict(dict) => {
                let body: Vec<String> = dict
                    .iter()
                    .map(|(k, v)| format!("{} {};", k, v.inline_text()))
                    .collect();
                format!("{{ {} }}", body.join(" "))
            }
        }
    }
}

impl From<&str> for FoamValue {
    fn from(text: &str) -> Self {
        FoamValue::Token(text.to_string())
    }
}

impl From<String> for FoamValue {
    fn from(text: String) -> Self {
        FoamValue::Token(text)
    }
}

impl From<FoamDict> for FoamValue {
    fn from(dict: FoamDict) -> Self {
        FoamValue::Dict(dict)
    }
}

/// Builds a dictionary from literal entries, keeping their order.
pub fn dict<const N: usize>(entries: [(&str, FoamValue); N]) -> FoamDict {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Renders a number the way solver dictionaries usually carry it:
/// small and large magnitudes in exponent form, everything else plain.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e6).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}
