use actix_web::{delete, get, post, put, web, HttpResponse, Result as WebResult};
use serde_json::json;
use tracing::error;

use crate::api::models::{
    CreatePetRequest, HealthUpdateRequest, ListPetsQuery, UpdateThreadRequest,
};
use crate::db::{service::DbService, DbPool};

#[post("")]
pub async fn create_pet(
    pool: web::Data<DbPool>,
    req: web::Json<CreatePetRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();
    let req = req.into_inner();

    match DbService::insert_pet(
        &conn,
        req.user_id,
        &req.name,
        &req.pet_type,
        &req.breed,
        req.age,
        &req.disease,
        &req.symptoms,
    ) {
        Ok(pet) => Ok(HttpResponse::Created().json(pet)),
        Err(e) => {
            error!("Error creating pet: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

#[get("")]
pub async fn list_pets(
    pool: web::Data<DbPool>,
    query: web::Query<ListPetsQuery>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::list_pets(&conn, query.user_id) {
        Ok(pets) => Ok(HttpResponse::Ok().json(pets)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[get("/{id}")]
pub async fn get_pet(pool: web::Data<DbPool>, id: web::Path<i64>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::get_pet(&conn, *id) {
        Ok(Some(pet)) => Ok(HttpResponse::Ok().json(pet)),
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" }))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

#[put("/{id}/thread")]
pub async fn update_thread(
    pool: web::Data<DbPool>,
    id: web::Path<i64>,
    req: web::Json<UpdateThreadRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::update_pet_thread(&conn, *id, &req.thread_id) {
        Ok(true) => match DbService::get_pet(&conn, *id) {
            Ok(Some(pet)) => Ok(HttpResponse::Ok().json(pet)),
            _ => Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" }))),
        },
        Ok(false) => Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" }))),
        Err(e) => {
            error!("Error saving thread id: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

#[put("/{id}/health-update")]
pub async fn health_update(
    pool: web::Data<DbPool>,
    id: web::Path<i64>,
    req: web::Json<HealthUpdateRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::update_pet_health(&conn, *id, &req.symptoms, &req.disease) {
        Ok(true) => match DbService::get_pet(&conn, *id) {
            Ok(Some(pet)) => Ok(HttpResponse::Ok().json(pet)),
            _ => Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" }))),
        },
        Ok(false) => Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" }))),
        Err(e) => {
            error!("Error updating pet health: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

#[delete("/{id}")]
pub async fn delete_pet(pool: web::Data<DbPool>, id: web::Path<i64>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();
    let id = *id;

    if DbService::get_pet(&conn, id).unwrap_or(None).is_none() {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Pet not found" })));
    }

    match DbService::delete_pet(&conn, id) {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/pets")
            .service(create_pet)
            .service(list_pets)
            .service(get_pet)
            .service(update_thread)
            .service(health_update)
            .service(delete_pet),
    );
}
