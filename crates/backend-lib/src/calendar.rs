// ============================
// crates/backend-lib/src/calendar.rs
// ============================
//! Calendar events owned by authenticated users.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kalenderium_common::{FieldErrors, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::validation::Validator;

const MAX_TITLE_LENGTH: usize = 80;
const MAX_DETAILS_LENGTH: usize = 1100;
const COLOR_LENGTH: usize = 7;

/// A stored calendar event
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color: String,
}

/// Event fields supplied by a client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub details: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color: String,
}

pub fn validate_event(v: &mut Validator, event: &NewEvent) {
    v.check(!event.name.is_empty(), "title", "must be provided");
    v.check(
        event.name.len() <= MAX_TITLE_LENGTH,
        "title",
        "must not be more than 80 bytes long",
    );

    v.check(!event.color.is_empty(), "color", "must be provided");
    v.check(event.color.starts_with('#'), "color", "must start with #");
    v.check(event.color.len() == COLOR_LENGTH, "color", "must be 7 bytes long");

    v.check(
        event.details.len() <= MAX_DETAILS_LENGTH,
        "body",
        "must not be more than 1100 bytes long",
    );
    v.check(event.end >= event.start, "end", "must not be before start");
}

/// Check every event rule at once
pub fn check_event(event: &NewEvent) -> Result<(), FieldErrors> {
    let mut v = Validator::new();
    validate_event(&mut v, event);
    v.finish()
}

/// Calendar persistence
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Validate and store an event for `user_id`; returns the new event id
    async fn add_event(&self, user_id: UserId, event: NewEvent) -> Result<String, AppError>;

    /// Every event owned by `user_id`, ordered by start time
    async fn list_events(&self, user_id: UserId) -> Result<Vec<Event>, AppError>;

    /// Remove an event; `RecordNotFound` unless `user_id` owns it
    async fn delete_event(&self, event_id: &str, user_id: UserId) -> Result<(), AppError>;
}

/// Process-local calendar store
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: DashMap<String, Event>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn add_event(&self, user_id: UserId, event: NewEvent) -> Result<String, AppError> {
        check_event(&event)?;

        let id = Uuid::new_v4().to_string();
        self.events.insert(
            id.clone(),
            Event {
                id: id.clone(),
                user_id,
                name: event.name,
                details: event.details,
                start: event.start,
                end: event.end,
                color: event.color,
            },
        );
        Ok(id)
    }

    async fn list_events(&self, user_id: UserId) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn delete_event(&self, event_id: &str, user_id: UserId) -> Result<(), AppError> {
        self.events
            .remove_if(event_id, |_, event| event.user_id == user_id)
            .map(|_| ())
            .ok_or_else(|| AppError::RecordNotFound("event not found".to_string()))
    }
}
