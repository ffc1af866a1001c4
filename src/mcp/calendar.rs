use crate::calendar::models::{Event, EventDateTime, ParseError};
use crate::calendar::{CalendarApi, parse_event_date_time, parse_recurrence};
use crate::config::McpConfig;
use crate::mcp::{failure, instructions, json_result, retain_enabled_tools, text_result};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub const TOOL_PREFIX: &str = "calendar_";

const DEFAULT_CALENDAR: &str = "primary";

#[derive(Debug, thiserror::Error)]
#[error("access to calendar is not allowed by configuration: {0}")]
pub struct AccessDenied(pub String);

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsRequest {
    #[serde(default)]
    #[schemars(description = "The calendar ID to list events from (default: 'primary').")]
    pub calendar: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "Lower bound (exclusive) for an event's end time to filter by. RFC3339 format. Default is now."
    )]
    pub time_min: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "Upper bound (exclusive) for an event's start time to filter by. RFC3339 format."
    )]
    pub time_max: Option<String>,
    #[serde(default, deserialize_with = "crate::mcp::whole_number")]
    #[schemars(description = "Maximum number of events to return.")]
    pub max_results: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    #[schemars(description = "The calendar ID to create the event in (default: 'primary').")]
    pub calendar: Option<String>,
    #[schemars(description = "Title of the event.")]
    pub summary: String,
    #[schemars(description = "Start time of the event (RFC3339 format, or YYYY-MM-DD for all-day events).")]
    pub start_time: String,
    #[schemars(description = "End time of the event (RFC3339 format, or YYYY-MM-DD for all-day events).")]
    pub end_time: String,
    #[serde(default)]
    #[schemars(description = "Description of the event.")]
    pub description: Option<String>,
    #[serde(default)]
    #[schemars(description = "Location of the event.")]
    pub location: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "Recurrence rules (RRULE) for the event (e.g. ['RRULE:FREQ=DAILY;COUNT=2'])."
    )]
    pub recurrence: Option<Value>,
}

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchEventRequest {
    #[serde(default)]
    #[schemars(description = "The calendar ID (default: 'primary').")]
    pub calendar: Option<String>,
    #[schemars(description = "The ID of the event to update.")]
    pub event_id: String,
    #[serde(default)]
    #[schemars(description = "New title of the event.")]
    pub summary: Option<String>,
    #[serde(default)]
    #[schemars(description = "New start time (RFC3339).")]
    pub start_time: Option<String>,
    #[serde(default)]
    #[schemars(description = "New end time (RFC3339).")]
    pub end_time: Option<String>,
    #[serde(default)]
    #[schemars(description = "New description.")]
    pub description: Option<String>,
    #[serde(default)]
    #[schemars(description = "New location.")]
    pub location: Option<String>,
    #[serde(default)]
    #[schemars(description = "New recurrence rules (replaces existing).")]
    pub recurrence: Option<Value>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventRequest {
    #[serde(default)]
    #[schemars(description = "The calendar ID (default: 'primary').")]
    pub calendar: Option<String>,
    #[schemars(description = "The ID of the event to delete.")]
    pub event_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveEventRequest {
    #[serde(default)]
    #[schemars(description = "The source calendar ID (default: 'primary').")]
    pub calendar: Option<String>,
    #[schemars(description = "The ID of the event to move.")]
    pub event_id: String,
    #[schemars(description = "The destination calendar ID.")]
    pub destination: String,
}

#[derive(Clone)]
pub struct CalendarMcp {
    tool_router: ToolRouter<CalendarMcp>,
    calendar: Arc<dyn CalendarApi>,
    allowed: Arc<[String]>,
    instructions: String,
}

impl std::fmt::Debug for CalendarMcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarMcp")
            .field("allowed", &self.allowed)
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}

#[tool_router]
impl CalendarMcp {
    /// `allowed` lists the calendar ids the tools may touch, empty allows all.
    pub fn new(calendar: Arc<dyn CalendarApi>, allowed: Vec<String>, config: &McpConfig) -> Self {
        let mut tool_router = Self::tool_router();
        retain_enabled_tools(&mut tool_router, config, TOOL_PREFIX);
        let instructions = instructions(
            "This server provides access to Google Calendar calendars and events.",
            &tool_router,
        );

        Self {
            tool_router,
            calendar,
            allowed: allowed.into(),
            instructions,
        }
    }

    fn is_allowed(&self, calendar_id: &str) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|allowed| allowed == calendar_id)
    }

    /// Resolve the calendar argument and check it against the allowlist.
    fn calendar_id(&self, calendar: Option<String>) -> Result<String, AccessDenied> {
        let calendar_id = calendar
            .filter(|calendar| !calendar.is_empty())
            .unwrap_or_else(|| DEFAULT_CALENDAR.to_string());

        if !self.is_allowed(&calendar_id) {
            return Err(AccessDenied(calendar_id));
        }

        Ok(calendar_id)
    }

    #[tool(
        name = "calendar_list",
        description = "List available calendars.",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn list(&self) -> Result<CallToolResult, McpError> {
        let calendars = match self.calendar.list_calendars().await {
            Ok(calendars) => calendars,
            Err(err) => return failure("list calendars", err),
        };

        let allowed: Vec<_> = calendars
            .into_iter()
            .filter(|entry| self.is_allowed(&entry.id))
            .collect();

        json_result(&allowed)
    }

    #[tool(
        name = "calendar_list_events",
        description = "List upcoming events from a specific calendar.",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn list_events(
        &self,
        Parameters(request): Parameters<ListEventsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let calendar_id = match self.calendar_id(request.calendar) {
            Ok(calendar_id) => calendar_id,
            Err(err) => return denied(err),
        };

        match self
            .calendar
            .list_events(
                &calendar_id,
                request.time_min.as_deref().unwrap_or_default(),
                request.time_max.as_deref().unwrap_or_default(),
                request.max_results.unwrap_or(0),
            )
            .await
        {
            Ok(events) => json_result(&events),
            Err(err) => failure("list events", err),
        }
    }

    #[tool(
        name = "calendar_create_event",
        description = "Create a new event in a specific calendar."
    )]
    #[instrument(skip(self))]
    async fn create_event(
        &self,
        Parameters(request): Parameters<CreateEventRequest>,
    ) -> Result<CallToolResult, McpError> {
        let calendar_id = match self.calendar_id(request.calendar) {
            Ok(calendar_id) => calendar_id,
            Err(err) => return denied(err),
        };

        let recurrence = match parse_recurrence(request.recurrence.as_ref()) {
            Ok(recurrence) => recurrence.unwrap_or_default(),
            Err(err) => return failure("parse recurrence", err),
        };
        let start = match parse_time("startTime", &request.start_time) {
            Ok(start) => start,
            Err(result) => return result,
        };
        let end = match parse_time("endTime", &request.end_time) {
            Ok(end) => end,
            Err(result) => return result,
        };

        let event = Event {
            summary: request.summary,
            description: request.description.unwrap_or_default(),
            location: request.location.unwrap_or_default(),
            start: Some(start),
            end: Some(end),
            recurrence,
            ..Default::default()
        };

        match self.calendar.create_event(&calendar_id, &event).await {
            Ok(created) => json_result(&created),
            Err(err) => failure("create event", err),
        }
    }

    #[tool(
        name = "calendar_patch_event",
        description = "Update/Patch an existing event in a specific calendar."
    )]
    #[instrument(skip(self))]
    async fn patch_event(
        &self,
        Parameters(request): Parameters<PatchEventRequest>,
    ) -> Result<CallToolResult, McpError> {
        let calendar_id = match self.calendar_id(request.calendar) {
            Ok(calendar_id) => calendar_id,
            Err(err) => return denied(err),
        };

        let mut patch = Event {
            summary: request.summary.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            location: request.location.unwrap_or_default(),
            ..Default::default()
        };

        if let Some(start_time) = request.start_time.filter(|value| !value.is_empty()) {
            match parse_time("startTime", &start_time) {
                Ok(start) => patch.start = Some(start),
                Err(result) => return result,
            }
        }
        if let Some(end_time) = request.end_time.filter(|value| !value.is_empty()) {
            match parse_time("endTime", &end_time) {
                Ok(end) => patch.end = Some(end),
                Err(result) => return result,
            }
        }

        match parse_recurrence(request.recurrence.as_ref()) {
            Ok(Some(recurrence)) => patch.recurrence = recurrence,
            Ok(None) => {}
            Err(err) => return failure("parse recurrence", err),
        }

        match self
            .calendar
            .patch_event(&calendar_id, &request.event_id, &patch)
            .await
        {
            Ok(patched) => json_result(&patched),
            Err(err) => failure("patch event", err),
        }
    }

    #[tool(
        name = "calendar_delete_event",
        description = "Delete an event from a specific calendar."
    )]
    #[instrument(skip(self))]
    async fn delete_event(
        &self,
        Parameters(DeleteEventRequest { calendar, event_id }): Parameters<DeleteEventRequest>,
    ) -> Result<CallToolResult, McpError> {
        let calendar_id = match self.calendar_id(calendar) {
            Ok(calendar_id) => calendar_id,
            Err(err) => return denied(err),
        };

        match self.calendar.delete_event(&calendar_id, &event_id).await {
            Ok(()) => text_result(format!(
                "Event {} deleted successfully from calendar {}",
                event_id, calendar_id
            )),
            Err(err) => failure("delete event", err),
        }
    }

    #[tool(
        name = "calendar_move_event",
        description = "Move an event from one calendar to another."
    )]
    #[instrument(skip(self))]
    async fn move_event(
        &self,
        Parameters(MoveEventRequest {
            calendar,
            event_id,
            destination,
        }): Parameters<MoveEventRequest>,
    ) -> Result<CallToolResult, McpError> {
        let calendar_id = match self.calendar_id(calendar) {
            Ok(calendar_id) => calendar_id,
            Err(err) => return denied(err),
        };

        if !self.is_allowed(&destination) {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "destination calendar: {}",
                AccessDenied(destination)
            ))]));
        }

        match self
            .calendar
            .move_event(&calendar_id, &event_id, &destination)
            .await
        {
            Ok(moved) => json_result(&moved),
            Err(err) => failure("move event", err),
        }
    }
}

fn denied(err: AccessDenied) -> Result<CallToolResult, McpError> {
    tracing::warn!(calendar = %err.0, "calendar not in allowlist");
    Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
}

fn parse_time(argument: &str, value: &str) -> Result<EventDateTime, Result<CallToolResult, McpError>> {
    parse_event_date_time(value).map_err(|err: ParseError| {
        Ok(CallToolResult::error(vec![Content::text(format!(
            "invalid {} format: {}",
            argument, err
        ))]))
    })
}

#[tool_handler]
impl ServerHandler for CalendarMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::models::CalendarListEntry;
    use crate::google::error::GoogleError;
    use crate::mcp::tests::{is_error, json_of, read_only_tools, text_of};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCalendar {
        created: Mutex<Vec<(String, Event)>>,
        patched: Mutex<Vec<(String, String, Event)>>,
        listed: Mutex<Vec<(String, String, String, u32)>>,
        deleted: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CalendarApi for FakeCalendar {
        async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, GoogleError> {
            Ok(["primary", "work@example.com", "family@example.com"]
                .into_iter()
                .map(|id| CalendarListEntry {
                    id: id.to_string(),
                    summary: id.to_uppercase(),
                    ..Default::default()
                })
                .collect())
        }

        async fn list_events(
            &self,
            calendar_id: &str,
            time_min: &str,
            time_max: &str,
            max_results: u32,
        ) -> Result<Vec<Event>, GoogleError> {
            self.listed.lock().unwrap().push((
                calendar_id.to_string(),
                time_min.to_string(),
                time_max.to_string(),
                max_results,
            ));
            Ok(vec![Event {
                id: "e1".to_string(),
                summary: "Standup".to_string(),
                ..Default::default()
            }])
        }

        async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<Event, GoogleError> {
            self.created
                .lock()
                .unwrap()
                .push((calendar_id.to_string(), event.clone()));
            let mut created = event.clone();
            created.id = "new1".to_string();
            Ok(created)
        }

        async fn patch_event(&self, calendar_id: &str, event_id: &str, event: &Event) -> Result<Event, GoogleError> {
            self.patched.lock().unwrap().push((
                calendar_id.to_string(),
                event_id.to_string(),
                event.clone(),
            ));
            let mut patched = event.clone();
            patched.id = event_id.to_string();
            Ok(patched)
        }

        async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), GoogleError> {
            self.deleted
                .lock()
                .unwrap()
                .push((calendar_id.to_string(), event_id.to_string()));
            Ok(())
        }

        async fn move_event(&self, _calendar_id: &str, event_id: &str, destination: &str) -> Result<Event, GoogleError> {
            Err(GoogleError::Api {
                status: 403,
                message: format!("cannot move {} to {}", event_id, destination),
            })
        }
    }

    fn server(allowed: &[&str]) -> (CalendarMcp, Arc<FakeCalendar>) {
        let fake = Arc::new(FakeCalendar::default());
        let allowed = allowed.iter().map(|id| id.to_string()).collect();
        (CalendarMcp::new(fake.clone(), allowed, &McpConfig::default()), fake)
    }

    #[test]
    fn should_only_mark_listing_tools_read_only() {
        let (server, _) = server(&[]);

        assert_eq!(
            vec!["calendar_list", "calendar_list_events"],
            read_only_tools(&server.tool_router)
        );
    }

    #[tokio::test]
    async fn should_filter_calendar_list() {
        let (server, _) = server(&["primary", "work@example.com"]);

        let result = server.list().await.unwrap();
        let ids: Vec<String> = json_of(&result)
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["id"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(vec!["primary", "work@example.com"], ids);
    }

    #[tokio::test]
    async fn should_return_empty_array_when_nothing_is_allowed() {
        let (server, _) = server(&["other@example.com"]);

        let result = server.list().await.unwrap();

        assert_eq!("[]", text_of(&result));
    }

    #[tokio::test]
    async fn should_default_to_primary_calendar() {
        let (server, fake) = server(&[]);

        let result = server
            .list_events(Parameters(ListEventsRequest {
                time_max: Some("2026-10-20T00:00:00Z".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!("Standup", json_of(&result)[0]["summary"]);
        assert_eq!(
            vec![(
                "primary".to_string(),
                String::new(),
                "2026-10-20T00:00:00Z".to_string(),
                0
            )],
            *fake.listed.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn should_deny_calendars_outside_allowlist() {
        let (server, fake) = server(&["primary"]);

        let result = server
            .delete_event(Parameters(DeleteEventRequest {
                calendar: Some("work@example.com".to_string()),
                event_id: "e1".to_string(),
            }))
            .await
            .unwrap();

        assert!(is_error(&result));
        assert_eq!(
            "access to calendar is not allowed by configuration: work@example.com",
            text_of(&result)
        );
        assert!(fake.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_create_event_with_parsed_times() {
        let (server, fake) = server(&[]);

        let result = server
            .create_event(Parameters(CreateEventRequest {
                summary: "Offsite".to_string(),
                start_time: "2026-11-02".to_string(),
                end_time: "2026-11-03T17:00:00+01:00".to_string(),
                location: Some("Berlin".to_string()),
                recurrence: Some(json!("RRULE:FREQ=YEARLY")),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(!is_error(&result));
        assert_eq!("new1", json_of(&result)["id"]);

        let created = fake.created.lock().unwrap();
        let (calendar_id, event) = &created[0];
        assert_eq!("primary", calendar_id);
        assert_eq!("2026-11-02", event.start.as_ref().unwrap().date);
        assert_eq!("2026-11-03T17:00:00+01:00", event.end.as_ref().unwrap().date_time);
        assert_eq!(vec!["RRULE:FREQ=YEARLY"], event.recurrence);
        assert_eq!("Berlin", event.location);
    }

    #[tokio::test]
    async fn should_reject_invalid_start_time() {
        let (server, fake) = server(&[]);

        let result = server
            .create_event(Parameters(CreateEventRequest {
                summary: "Broken".to_string(),
                start_time: "next tuesday".to_string(),
                end_time: "2026-11-03".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(is_error(&result));
        assert!(text_of(&result).starts_with("invalid startTime format: "));
        assert!(fake.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_only_send_given_patch_fields() {
        let (server, fake) = server(&[]);

        let result = server
            .patch_event(Parameters(PatchEventRequest {
                event_id: "e1".to_string(),
                location: Some("Room 4".to_string()),
                end_time: Some(String::new()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(!is_error(&result));
        let patched = fake.patched.lock().unwrap();
        assert_eq!(
            json!({"location": "Room 4"}),
            serde_json::to_value(&patched[0].2).unwrap()
        );
    }

    #[tokio::test]
    async fn should_confirm_deletion() {
        let (server, _) = server(&[]);

        let result = server
            .delete_event(Parameters(DeleteEventRequest {
                calendar: None,
                event_id: "e9".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!("Event e9 deleted successfully from calendar primary", text_of(&result));
    }

    #[tokio::test]
    async fn should_check_move_destination() {
        let (server, _) = server(&["primary"]);

        let result = server
            .move_event(Parameters(MoveEventRequest {
                calendar: None,
                event_id: "e1".to_string(),
                destination: "family@example.com".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(
            "destination calendar: access to calendar is not allowed by configuration: family@example.com",
            text_of(&result)
        );
    }

    #[tokio::test]
    async fn should_report_move_failures() {
        let (server, _) = server(&[]);

        let result = server
            .move_event(Parameters(MoveEventRequest {
                calendar: None,
                event_id: "e1".to_string(),
                destination: "family@example.com".to_string(),
            }))
            .await
            .unwrap();

        assert!(is_error(&result));
        assert_eq!(
            "failed to move event: cannot move e1 to family@example.com (status 403)",
            text_of(&result)
        );
    }
}
