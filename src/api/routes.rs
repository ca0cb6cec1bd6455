use actix_web::{get, post, web, HttpRequest, HttpResponse, Result as WebResult};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::api::models::{
    CreateThreadRequest, EndSessionRequest, SendMessageRequest, StatusQuery,
};
use crate::db::{
    service::{DbService, SessionClose},
    DbPool,
};
use crate::orchestrator::{OrchestrationError, StartTurn, TurnOrchestrator, TurnStatus};

/// Header relaying the client's current analytics session, if any.
const SESSION_HEADER: &str = "X-Session-Id";

fn error_response(e: &OrchestrationError) -> HttpResponse {
    match e {
        OrchestrationError::Validation(msg) => {
            HttpResponse::BadRequest().json(json!({ "error": msg }))
        }
        OrchestrationError::NotFound => {
            HttpResponse::NotFound().json(json!({ "error": "Run not found" }))
        }
        other => HttpResponse::InternalServerError().json(json!({ "error": other.to_string() })),
    }
}

// --- Threads & turns ---

#[post("/thread")]
pub async fn create_thread(
    orchestrator: web::Data<TurnOrchestrator>,
    req: web::Json<CreateThreadRequest>,
) -> WebResult<HttpResponse> {
    let req = req.into_inner();

    match orchestrator.open_thread(req.pet_id, req.pet_info.as_ref()).await {
        Ok(thread) => Ok(HttpResponse::Ok().json(json!({
            "threadId": thread.thread_id,
            "needsUpdate": thread.needs_update,
            "initialMessage": thread.initial_message,
        }))),
        Err(e) => {
            error!("Thread creation error: {}", e);
            Ok(error_response(&e))
        }
    }
}

#[post("/message")]
pub async fn send_message(
    orchestrator: web::Data<TurnOrchestrator>,
    http: HttpRequest,
    req: web::Json<SendMessageRequest>,
) -> WebResult<HttpResponse> {
    let session_hint = http
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Uuid>().ok());
    let user_agent = http
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let req = req.into_inner();
    let turn = StartTurn {
        thread_id: req.thread_id,
        message: req.message,
        pet: req.pet_info,
        session_hint,
        user_agent,
    };

    match orchestrator.start_turn(turn).await {
        Ok(handle) => Ok(HttpResponse::Ok().json(json!({
            "runId": handle.run_id,
            "status": handle.status,
        }))),
        Err(e) => {
            error!("Error starting turn: {}", e);
            Ok(error_response(&e))
        }
    }
}

#[get("/message-status/{run_id}")]
pub async fn message_status(
    orchestrator: web::Data<TurnOrchestrator>,
    run_id: web::Path<String>,
    query: web::Query<StatusQuery>,
) -> WebResult<HttpResponse> {
    match orchestrator
        .get_status(&run_id, query.thread_id.as_deref())
        .await
    {
        Ok(TurnStatus::Completed { response, source }) => Ok(HttpResponse::Ok().json(json!({
            "status": "completed",
            "response": response,
            "source": source.as_str(),
        }))),
        Ok(TurnStatus::InProgress { status }) => Ok(HttpResponse::Ok().json(json!({
            "status": status,
            "message": "Your request is still being processed",
        }))),
        Ok(TurnStatus::Failed { error }) => Ok(HttpResponse::Ok().json(json!({
            "status": "failed",
            "error": error,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

// --- Sessions ---

#[post("/session/end")]
pub async fn end_session(
    pool: web::Data<DbPool>,
    req: web::Json<EndSessionRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::end_session(&conn, req.session_id) {
        Ok(SessionClose::Closed) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "alreadyEnded": false })))
        }
        Ok(SessionClose::AlreadyEnded) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "alreadyEnded": true })))
        }
        Ok(SessionClose::NotFound) => {
            Ok(HttpResponse::NotFound().json(json!({ "error": "Session not found" })))
        }
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

// --- History & staleness ---

#[get("/chat-history/{pet_id}")]
pub async fn chat_history(
    pool: web::Data<DbPool>,
    pet_id: web::Path<i64>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::chat_history(&conn, *pet_id) {
        Ok(messages) => Ok(HttpResponse::Ok().json(messages)),
        Err(e) => {
            error!("Error fetching chat history: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

#[get("/check-update/{pet_id}")]
pub async fn check_update(
    orchestrator: web::Data<TurnOrchestrator>,
    pet_id: web::Path<i64>,
) -> WebResult<HttpResponse> {
    match orchestrator.needs_update(*pet_id) {
        Ok(needs_update) => Ok(HttpResponse::Ok().json(json!({ "needsUpdate": needs_update }))),
        Err(e) => {
            error!("Error checking update status: {}", e);
            Ok(error_response(&e))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/assistant")
            .service(create_thread)
            .service(send_message)
            .service(message_status)
            .service(end_session)
            .service(chat_history)
            .service(check_update),
    );
}
