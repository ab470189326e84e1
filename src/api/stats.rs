use actix_web::{HttpResponse, Responder, get, web};
use log::error;

use super::models::AppState;

/// Latest gas price snapshot; 503 until the first dump has run.
#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let latest = match state.latest.read() {
        Ok(latest) => latest.clone(),
        Err(_) => {
            error!("Error (stats): snapshot lock poisoned");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match latest {
        Some(snapshot) => HttpResponse::Ok().json(snapshot),
        None => HttpResponse::ServiceUnavailable().body("no snapshot yet"),
    }
}
