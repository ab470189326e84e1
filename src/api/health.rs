use actix_web::{HttpResponse, Responder, get, web};
use chrono::Utc;

use super::models::{AppState, HealthResponse};

#[get("/health/")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "up",
        idle_secs: state.canary.idle_for(Utc::now().timestamp()),
    })
}
