//! User-adjustable view parameters and their URL encoding.

use std::fmt;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "title")]
    Title,
    #[default]
    #[serde(rename = "createdTime")]
    CreatedTime,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::CreatedTime => "createdTime",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The committed view: what the next fetch asks the server for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub search_text: String,
}

impl ViewQuery {
    /// Query string for this view, without the leading `?`.
    ///
    /// Sort keys keep their literal brackets. The search filter is only
    /// present for non-empty search text and its formula is percent-encoded.
    pub fn to_query_string(&self) -> String {
        let mut query = format!(
            "sort[0][field]={}&sort[0][direction]={}",
            self.sort_field, self.sort_direction
        );
        if !self.search_text.is_empty() {
            let formula = search_formula(&self.search_text);
            query.push_str("&filterByFormula=");
            query.extend(utf8_percent_encode(&formula, NON_ALPHANUMERIC));
        }
        query
    }
}

/// `SEARCH("<text>",{title})` with the text escaped as a formula string literal.
pub fn search_formula(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("SEARCH(\"{escaped}\",{{title}})")
}
