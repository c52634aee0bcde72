//! Server-rendered admin pages for restaurants and their dishes.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::Utc;
use serde::Serialize;
use tera::{Context, Tera};

use crate::AppState;
use crate::error::AppError;
use crate::models::{Dish, Restaurant, RestaurantForm};

const PREFIX: &str = "/admin/restaurants";

pub fn templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (
            "admin/layout.html",
            include_str!("../../templates/admin/layout.html"),
        ),
        (
            "admin/index.html",
            include_str!("../../templates/admin/index.html"),
        ),
        (
            "admin/show.html",
            include_str!("../../templates/admin/show.html"),
        ),
        (
            "admin/form.html",
            include_str!("../../templates/admin/form.html"),
        ),
    ])?;
    Ok(tera)
}

#[derive(Debug, Serialize)]
struct RestaurantRow {
    id: i32,
    title: String,
    description: String,
    dishes_count: i64,
}

#[derive(Debug, Serialize)]
struct RestaurantView {
    id: i32,
    title: String,
    description: String,
}

impl From<Restaurant> for RestaurantView {
    fn from(r: Restaurant) -> Self {
        RestaurantView {
            id: r.id,
            title: r.title.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DishRow {
    title: String,
    dish_type: String,
    ingredients: String,
    description: String,
    price: String,
}

impl From<Dish> for DishRow {
    fn from(d: Dish) -> Self {
        DishRow {
            title: d.title.unwrap_or_default(),
            dish_type: d.dish_type.map(|t| t.to_string()).unwrap_or_default(),
            ingredients: d.ingredients.unwrap_or_default(),
            description: d.description.unwrap_or_default(),
            price: d.price.map(|p| p.to_string()).unwrap_or_default(),
        }
    }
}

fn restaurant_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("restaurant {}", id))
}

fn render(state: &AppState, template: &str, ctx: &Context) -> Result<HttpResponse, AppError> {
    let body = state.templates.render(template, ctx)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn see_other(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn form_context(heading: &str, action: String, submit: &str, form: RestaurantForm) -> Context {
    let mut ctx = Context::new();
    ctx.insert("heading", heading);
    ctx.insert("action", &action);
    ctx.insert("submit", submit);
    ctx.insert("title", &form.title.unwrap_or_default());
    ctx.insert("description", &form.description.unwrap_or_default());
    ctx
}

#[get("/admin")]
pub async fn dashboard(req: HttpRequest) -> HttpResponse {
    log::debug!("Redirecting from: {}", req.uri());
    see_other(PREFIX.to_string())
}

#[get("/admin/restaurants")]
pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let store = state.store.clone();
    let summaries = web::block(move || store.list_restaurants()).await??;
    let rows: Vec<RestaurantRow> = summaries
        .into_iter()
        .map(|s| RestaurantRow {
            id: s.restaurant.id,
            title: s.restaurant.title.unwrap_or_default(),
            description: s.restaurant.description.unwrap_or_default(),
            dishes_count: s.dishes_count,
        })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("restaurants", &rows);
    render(&state, "admin/index.html", &ctx)
}

#[get("/admin/restaurants/new")]
pub async fn new_restaurant(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let ctx = form_context(
        "New Restaurant",
        PREFIX.to_string(),
        "Create Restaurant",
        RestaurantForm::default(),
    );
    render(&state, "admin/form.html", &ctx)
}

#[post("/admin/restaurants")]
pub async fn create_restaurant(
    state: web::Data<AppState>,
    form: web::Form<RestaurantForm>,
) -> Result<HttpResponse, AppError> {
    let new = form.into_inner().into_new(Utc::now().naive_utc());
    let store = state.store.clone();
    let restaurant = web::block(move || store.create_restaurant(new)).await??;
    log::info!("Created restaurant {}", restaurant.id);
    Ok(see_other(format!("{}/{}", PREFIX, restaurant.id)))
}

#[get("/admin/restaurants/{id}")]
pub async fn show_restaurant(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = state.store.clone();
    let (restaurant, dishes) = web::block(move || {
        let restaurant = store.find_restaurant(id)?;
        let dishes = match restaurant {
            Some(_) => store.dishes_of_restaurant(id)?,
            None => Vec::new(),
        };
        Ok::<_, AppError>((restaurant, dishes))
    })
    .await??;
    let restaurant = restaurant.ok_or_else(|| restaurant_not_found(id))?;

    let dishes: Vec<DishRow> = dishes.into_iter().map(DishRow::from).collect();
    let mut ctx = Context::new();
    ctx.insert("restaurant", &RestaurantView::from(restaurant));
    ctx.insert("dishes", &dishes);
    render(&state, "admin/show.html", &ctx)
}

#[get("/admin/restaurants/{id}/edit")]
pub async fn edit_restaurant(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = state.store.clone();
    let restaurant = web::block(move || store.find_restaurant(id))
        .await??
        .ok_or_else(|| restaurant_not_found(id))?;

    let form = RestaurantForm {
        title: restaurant.title,
        description: restaurant.description,
    };
    let ctx = form_context(
        "Edit Restaurant",
        format!("{}/{}", PREFIX, id),
        "Update Restaurant",
        form,
    );
    render(&state, "admin/form.html", &ctx)
}

#[post("/admin/restaurants/{id}")]
pub async fn update_restaurant(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    form: web::Form<RestaurantForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let changes = form.into_inner().into_changes(Utc::now().naive_utc());
    let store = state.store.clone();
    web::block(move || store.update_restaurant(id, changes))
        .await??
        .ok_or_else(|| restaurant_not_found(id))?;
    log::info!("Updated restaurant {}", id);
    Ok(see_other(format!("{}/{}", PREFIX, id)))
}

#[post("/admin/restaurants/{id}/delete")]
pub async fn destroy_restaurant(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = state.store.clone();
    if !web::block(move || store.delete_restaurant(id)).await?? {
        return Err(restaurant_not_found(id));
    }
    log::info!("Deleted restaurant {}", id);
    Ok(see_other(PREFIX.to_string()))
}
