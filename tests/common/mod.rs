#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use chrono::Utc;

use menu_admin::models::{Dish, DishAttributes, DishTypeParam, Restaurant, RestaurantForm};
use menu_admin::store::{MemoryStore, MenuStore};
use menu_admin::AppState;

/// Mirrors the `one`/`two` fixtures: one restaurant with a single dish and
/// an empty second restaurant.
pub struct Fixtures {
    pub store: Arc<MemoryStore>,
    pub restaurant: Restaurant,
    pub empty_restaurant: Restaurant,
    pub dish: Dish,
}

pub fn fixtures() -> Fixtures {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now().naive_utc();

    let restaurant = store
        .create_restaurant(
            RestaurantForm {
                title: Some("Noodle Bar".to_string()),
                description: Some("Fresh noodles every day".to_string()),
            }
            .into_new(now),
        )
        .unwrap();
    let empty_restaurant = store
        .create_restaurant(
            RestaurantForm {
                title: Some("Burger Joint".to_string()),
                description: Some("Opening soon".to_string()),
            }
            .into_new(now),
        )
        .unwrap();
    let dish = store
        .create_dish(
            DishAttributes {
                title: Some("Chicken Udon".to_string()),
                dish_type: Some(DishTypeParam::Name("wok".to_string())),
                ingredients: Some("udon, chicken, teriyaki".to_string()),
                description: Some("Stir-fried udon".to_string()),
                price: Some("9.50".parse().unwrap()),
                restaurant_id: Some(restaurant.id),
            }
            .into_new_dish(now)
            .unwrap(),
        )
        .unwrap();

    Fixtures {
        store,
        restaurant,
        empty_restaurant,
        dish,
    }
}

pub fn state(store: &Arc<MemoryStore>) -> web::Data<AppState> {
    web::Data::new(AppState::new(store.clone()).unwrap())
}

pub fn dish_count(store: &MemoryStore) -> usize {
    store.list_dishes().unwrap().len()
}
