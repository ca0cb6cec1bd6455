use actix_web::{get, web, HttpResponse, Result as WebResult};
use serde_json::json;

use crate::db::{service::DbService, DbPool};

#[get("/stats")]
pub async fn stats(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::overall_stats(&conn) {
        Ok(stats) => Ok(HttpResponse::Ok().json(stats)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/pet-types")]
pub async fn pet_types(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::pet_type_counts(&conn) {
        Ok(rows) => Ok(HttpResponse::Ok().json(rows)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/diseases")]
pub async fn diseases(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::disease_counts(&conn) {
        Ok(rows) => Ok(HttpResponse::Ok().json(rows)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/ratings")]
pub async fn ratings(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::rating_counts(&conn) {
        Ok(rows) => Ok(HttpResponse::Ok().json(rows)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/topics")]
pub async fn topics(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::topic_counts(&conn) {
        Ok(rows) => Ok(HttpResponse::Ok().json(rows)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/sessions")]
pub async fn sessions(pool: web::Data<DbPool>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::session_stats(&conn) {
        Ok(session_stats) => Ok(HttpResponse::Ok().json(session_stats)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .service(stats)
            .service(pet_types)
            .service(diseases)
            .service(ratings)
            .service(topics)
            .service(sessions),
    );
}
