use actix_web::http::header;
use actix_web::{HttpResponse, delete, get, post, route, web};
use chrono::Utc;

use crate::AppState;
use crate::error::AppError;
use crate::models::DishPayload;

fn dish_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("dish {}", id))
}

#[get("/dishes")]
pub async fn list_dishes(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let store = state.store.clone();
    let dishes = web::block(move || store.list_dishes()).await??;
    Ok(HttpResponse::Ok().json(dishes))
}

#[post("/dishes")]
pub async fn create_dish(
    state: web::Data<AppState>,
    payload: web::Json<DishPayload>,
) -> Result<HttpResponse, AppError> {
    let new = payload
        .into_inner()
        .into_attributes()
        .into_new_dish(Utc::now().naive_utc())?;

    let store = state.store.clone();
    let dish = web::block(move || store.create_dish(new)).await??;
    log::info!("Created dish {} in restaurant {}", dish.id, dish.restaurant_id);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/dishes/{}", dish.id)))
        .json(dish))
}

#[get("/dishes/{id}")]
pub async fn show_dish(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = state.store.clone();
    let dish = web::block(move || store.find_dish(id))
        .await??
        .ok_or_else(|| dish_not_found(id))?;
    Ok(HttpResponse::Ok().json(dish))
}

#[route("/dishes/{id}", method = "PATCH", method = "PUT")]
pub async fn update_dish(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    payload: web::Json<DishPayload>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let changes = payload
        .into_inner()
        .into_attributes()
        .into_changes(Utc::now().naive_utc())?;

    let store = state.store.clone();
    let dish = web::block(move || store.update_dish(id, changes))
        .await??
        .ok_or_else(|| dish_not_found(id))?;
    log::info!("Updated dish {}", id);
    Ok(HttpResponse::Ok().json(dish))
}

#[delete("/dishes/{id}")]
pub async fn destroy_dish(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = state.store.clone();
    if !web::block(move || store.delete_dish(id)).await?? {
        return Err(dish_not_found(id));
    }
    log::info!("Deleted dish {}", id);
    Ok(HttpResponse::NoContent().finish())
}
