use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub pet_type: String,
    pub breed: String,
    pub age: i32,
    pub disease: String,
    pub symptoms: String,
    pub thread_id: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub pet_id: i64,
    pub thread_id: String,
    pub session_id: Option<Uuid>,
    pub role: String,
    pub message: String,
    pub response_time_ms: Option<i64>,
    pub is_understood: bool,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub device_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub messages_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTopic {
    pub id: i64,
    pub message_id: i64,
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub pet_id: i64,
    pub thread_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only aggregation rows for the admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OverallStats {
    pub total_users: i64,
    pub total_pets: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub total_sessions: i64,
    pub open_sessions: i64,
    pub avg_messages: Option<f64>,
    pub devices: Vec<LabelCount>,
}
