use actix_web::{post, web, HttpResponse, Result as WebResult};
use serde_json::json;
use tracing::error;

use crate::api::models::CreateFeedbackRequest;
use crate::db::{service::DbService, DbPool};

#[post("")]
pub async fn create_feedback(
    pool: web::Data<DbPool>,
    req: web::Json<CreateFeedbackRequest>,
) -> WebResult<HttpResponse> {
    if !(1..=5).contains(&req.rating) {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "error": "rating must be between 1 and 5" })));
    }

    let conn = pool.lock().unwrap();

    match DbService::insert_feedback(
        &conn,
        req.pet_id,
        &req.thread_id,
        req.rating,
        req.comment.as_deref(),
    ) {
        Ok(feedback) => Ok(HttpResponse::Ok().json(feedback)),
        Err(e) => {
            error!("Error saving feedback: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/feedback").service(create_feedback));
}
