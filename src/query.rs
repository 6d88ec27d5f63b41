//! Typed query arguments for collection reads
//!
//! `limit` and `offset` are coerced to integers, `filter` is JSON-decoded
//! into a [`Filter`] predicate, and every other argument is passed through
//! verbatim to the connector's `items` call.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::WebApiError;
use crate::filtering::Filter;

/// Parsed query arguments of a collection GET
#[derive(Debug, Clone, Default)]
pub struct QueryArguments {
    /// Maximum number of items to return
    pub limit: Option<u64>,
    /// Index of the first item to return
    pub offset: Option<u64>,
    /// Decoded filter predicate
    pub filter: Filter,
    /// All other arguments, verbatim and multi-valued
    pub extra: HashMap<String, Vec<String>>,
}

impl QueryArguments {
    /// Parse a raw query string.
    ///
    /// Fails with `BadQueryArguments` when `limit`/`offset` are not
    /// non-negative integers or `filter` is not a JSON object.
    pub fn parse(raw_query: Option<&str>) -> Result<Self, WebApiError> {
        let mut args = Self::default();
        let Some(raw) = raw_query else {
            return Ok(args);
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "limit" => args.limit = Some(parse_count("limit", &value)?),
                "offset" => args.offset = Some(parse_count("offset", &value)?),
                "filter" => {
                    let spec: Value = serde_json::from_str(&value).map_err(|err| {
                        WebApiError::bad_query_arguments(format!(
                            "filter is not valid JSON: {}",
                            err
                        ))
                    })?;
                    args.filter = Filter::from_spec(Some(&spec))?;
                }
                _ => args
                    .extra
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned()),
            }
        }

        Ok(args)
    }
}

fn parse_count(name: &str, value: &str) -> Result<u64, WebApiError> {
    value.parse().map_err(|_| {
        WebApiError::bad_query_arguments(format!(
            "{} must be a non-negative integer, got '{}'",
            name, value
        ))
    })
}
