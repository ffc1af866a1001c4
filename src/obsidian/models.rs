use crate::obsidian::error::ObsidianError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Accept header asking the API for a parsed note instead of raw markdown.
pub const NOTE_JSON: &str = "application/vnd.olrapi.note+json";

/// A note with its frontmatter, tags and file stats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub content: String,
    pub frontmatter: Map<String, Value>,
    pub path: String,
    pub stat: FileStat,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStat {
    pub ctime: f64,
    pub mtime: f64,
    pub size: f64,
}

/// Structured error body of the REST API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorResponse {
    pub error_code: i64,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub filename: String,
    pub score: f64,
    pub matches: Vec<SearchMatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchMatch {
    pub context: String,
    #[serde(rename = "match")]
    pub span: MatchSpan,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSpan {
    pub start: i64,
    pub end: i64,
}

/// Result row of a JsonLogic or Dataview query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResult {
    pub filename: String,
    pub result: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    pub id: String,
    pub name: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ObsidianError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ObsidianError::unknown_variant(
                        $kind,
                        other,
                        concat!($($wire, " "),+).trim_ascii_end(),
                    )),
                }
            }
        }
    };
}

wire_enum!(PatchOperation, "operation", {
    Append => "append",
    Prepend => "prepend",
    Replace => "replace",
});

wire_enum!(TargetType, "target type", {
    Heading => "heading",
    Block => "block",
    Frontmatter => "frontmatter",
});

wire_enum!(Period, "period", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});
