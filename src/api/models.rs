use serde::Deserialize;
use uuid::Uuid;

use crate::orchestrator::PetSnapshot;

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(rename = "petId")]
    pub pet_id: i64,
    #[serde(rename = "petInfo", default)]
    pub pet_info: Option<PetSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub message: String,
    #[serde(rename = "petInfo")]
    pub pet_info: PetSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    pub pet_type: String,
    pub breed: String,
    pub age: i32,
    pub disease: String,
    pub symptoms: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListPetsQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThreadRequest {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthUpdateRequest {
    pub symptoms: String,
    pub disease: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub pet_id: i64,
    pub thread_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}
