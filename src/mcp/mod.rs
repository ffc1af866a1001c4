//! MCP tool servers.
//!
//! Each server owns an api client and a [`ToolRouter`] built by the rmcp
//! macros. Tools switched off in the `mcp.tools` section of the config are
//! removed from the router before the server starts, so they are neither
//! listed nor callable.

pub mod calendar;
pub mod gmail;
pub mod obsidian;

use crate::config::McpConfig;
use rmcp::ErrorData as McpError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

pub use calendar::CalendarMcp;
pub use gmail::GmailMcp;
pub use obsidian::ObsidianMcp;

/// Drop every route `config` does not enable.
pub(crate) fn retain_enabled_tools<S>(router: &mut ToolRouter<S>, config: &McpConfig, prefix: &str)
where
    S: Send + Sync + 'static,
{
    let disabled: Vec<String> = router
        .list_all()
        .into_iter()
        .map(|tool| tool.name.to_string())
        .filter(|name| !config.tool_enabled(name, prefix))
        .collect();

    for name in disabled {
        tracing::debug!(tool = %name, "tool disabled by configuration");
        router.remove_route(&name);
    }
}

/// Server instructions naming the registered tools.
pub(crate) fn instructions<S>(summary: &str, router: &ToolRouter<S>) -> String
where
    S: Send + Sync + 'static,
{
    let mut names: Vec<String> = router
        .list_all()
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    names.sort();

    format!("{} Tools: {}.", summary, names.join(", "))
}

/// Optional count argument. Any non-negative JSON number is accepted,
/// `10.0` included, and the fraction is dropped.
pub(crate) fn whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let Some(number) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if !number.is_finite() || number < 0.0 {
        return Err(D::Error::custom(format!(
            "expected a non-negative number, got {}",
            number
        )));
    }

    T::try_from(number.trunc() as u64)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("number {} is out of range", number)))
}

pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

pub(crate) fn text_result(text: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

/// Tool level failure, reported to the agent instead of as a protocol error.
pub(crate) fn failure(action: &str, err: impl Display) -> Result<CallToolResult, McpError> {
    tracing::warn!(%err, "failed to {}", action);
    Ok(CallToolResult::error(vec![Content::text(format!(
        "failed to {}: {}",
        action, err
    ))]))
}

#[cfg(test)]
pub(crate) mod tests {
    use rmcp::handler::server::router::tool::ToolRouter;
    use rmcp::model::CallToolResult;

    /// Sorted names of the tools advertised with `readOnlyHint: true`.
    pub(crate) fn read_only_tools<S>(router: &ToolRouter<S>) -> Vec<String>
    where
        S: Send + Sync + 'static,
    {
        let mut names: Vec<String> = router
            .list_all()
            .into_iter()
            .filter(|tool| {
                tool.annotations
                    .as_ref()
                    .and_then(|annotations| annotations.read_only_hint)
                    == Some(true)
            })
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn text_of(result: &CallToolResult) -> &str {
        result.content[0]
            .as_text()
            .map(|text| text.text.as_str())
            .unwrap_or_default()
    }

    pub(crate) fn json_of(result: &CallToolResult) -> serde_json::Value {
        serde_json::from_str(text_of(result)).unwrap()
    }

    pub(crate) fn is_error(result: &CallToolResult) -> bool {
        result.is_error.unwrap_or(false)
    }

    #[derive(Debug, serde::Deserialize)]
    struct Limit {
        #[serde(default, deserialize_with = "super::whole_number")]
        limit: Option<u32>,
    }

    fn limit(json: &str) -> Result<Option<u32>, serde_json::Error> {
        serde_json::from_str::<Limit>(json).map(|parsed| parsed.limit)
    }

    #[test]
    fn should_accept_counts_sent_as_floats() {
        assert_eq!(Some(10), limit(r#"{"limit": 10}"#).unwrap());
        assert_eq!(Some(10), limit(r#"{"limit": 10.0}"#).unwrap());
        assert_eq!(Some(7), limit(r#"{"limit": 7.9}"#).unwrap());
        assert_eq!(None, limit(r#"{"limit": null}"#).unwrap());
        assert_eq!(None, limit("{}").unwrap());
    }

    #[test]
    fn should_reject_negative_or_oversized_counts() {
        assert!(limit(r#"{"limit": -1}"#).is_err());
        assert!(limit(r#"{"limit": 1e12}"#).is_err());
        assert!(limit(r#"{"limit": "10"}"#).is_err());
    }
}
