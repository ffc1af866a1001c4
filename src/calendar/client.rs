use crate::calendar::models::{CalendarListEntry, Event, ItemsResponse};
use crate::google::api::GoogleApi;
use crate::google::error::GoogleError;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

/// Calendar operations used by the tools.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, GoogleError>;

    /// Single (expanded) events ordered by start time. An empty `time_min`
    /// means now, an empty `time_max` and a zero `max_results` are not sent.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
        max_results: u32,
    ) -> Result<Vec<Event>, GoogleError>;

    async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<Event, GoogleError>;

    async fn patch_event(&self, calendar_id: &str, event_id: &str, event: &Event) -> Result<Event, GoogleError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), GoogleError>;

    async fn move_event(&self, calendar_id: &str, event_id: &str, destination: &str) -> Result<Event, GoogleError>;
}

#[derive(Clone, Debug)]
pub struct CalendarClient {
    api: GoogleApi,
}

impl CalendarClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    fn events_url(&self, calendar_id: &str, rest: &[&str]) -> Result<url::Url, GoogleError> {
        let mut segments = vec!["calendar", "v3", "calendars", calendar_id, "events"];
        segments.extend_from_slice(rest);
        self.api.url(&segments)
    }
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, GoogleError> {
        let url = self.api.url(&["calendar", "v3", "users", "me", "calendarList"])?;
        let response: ItemsResponse<CalendarListEntry> = self.api.get(url).await?;
        Ok(response.items)
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
        max_results: u32,
    ) -> Result<Vec<Event>, GoogleError> {
        let time_min = if time_min.is_empty() {
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        } else {
            time_min.to_string()
        };

        let mut url = self.events_url(calendar_id, &[])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("showDeleted", "false")
                .append_pair("singleEvents", "true")
                .append_pair("orderBy", "startTime")
                .append_pair("timeMin", &time_min);
            if !time_max.is_empty() {
                query.append_pair("timeMax", time_max);
            }
            if max_results > 0 {
                query.append_pair("maxResults", &max_results.to_string());
            }
        }

        let response: ItemsResponse<Event> = self.api.get(url).await?;
        Ok(response.items)
    }

    async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<Event, GoogleError> {
        let url = self.events_url(calendar_id, &[])?;
        self.api.post(url, Some(event)).await
    }

    async fn patch_event(&self, calendar_id: &str, event_id: &str, event: &Event) -> Result<Event, GoogleError> {
        let url = self.events_url(calendar_id, &[event_id])?;
        self.api.patch(url, event).await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), GoogleError> {
        let url = self.events_url(calendar_id, &[event_id])?;
        self.api.delete(url).await
    }

    async fn move_event(&self, calendar_id: &str, event_id: &str, destination: &str) -> Result<Event, GoogleError> {
        let mut url = self.events_url(calendar_id, &[event_id, "move"])?;
        url.query_pairs_mut().append_pair("destination", destination);
        self.api.post::<(), _>(url, None).await
    }
}
