use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;
use crate::models::{
    Dish, DishChanges, NewDish, NewRestaurant, Restaurant, RestaurantChanges,
};

/// A restaurant together with the number of dishes it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantSummary {
    pub restaurant: Restaurant,
    pub dishes_count: i64,
}

/// Storage operations behind the admin pages and the dish API. Every method
/// is a single blocking round trip; handlers run them on the blocking pool.
pub trait MenuStore: Send + Sync {
    fn list_restaurants(&self) -> Result<Vec<RestaurantSummary>, AppError>;
    fn find_restaurant(&self, id: i32) -> Result<Option<Restaurant>, AppError>;
    fn create_restaurant(&self, new: NewRestaurant) -> Result<Restaurant, AppError>;
    fn update_restaurant(
        &self,
        id: i32,
        changes: RestaurantChanges,
    ) -> Result<Option<Restaurant>, AppError>;
    /// Returns `Ok(false)` when no such restaurant exists and
    /// `AppError::Conflict` while it still owns dishes.
    fn delete_restaurant(&self, id: i32) -> Result<bool, AppError>;
    fn dishes_of_restaurant(&self, restaurant_id: i32) -> Result<Vec<Dish>, AppError>;

    fn list_dishes(&self) -> Result<Vec<Dish>, AppError>;
    fn find_dish(&self, id: i32) -> Result<Option<Dish>, AppError>;
    fn create_dish(&self, new: NewDish) -> Result<Dish, AppError>;
    fn update_dish(&self, id: i32, changes: DishChanges) -> Result<Option<Dish>, AppError>;
    fn delete_dish(&self, id: i32) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
struct Tables {
    restaurants: BTreeMap<i32, Restaurant>,
    dishes: BTreeMap<i32, Dish>,
    last_restaurant_id: i32,
    last_dish_id: i32,
}

impl Tables {
    fn dishes_count(&self, restaurant_id: i32) -> i64 {
        self.dishes
            .values()
            .filter(|d| d.restaurant_id == restaurant_id)
            .count() as i64
    }
}

/// Non-durable store holding both tables in memory. Enforces the same
/// foreign key rules as the Postgres schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables.lock().map_err(|_| AppError::Poisoned)
    }
}

impl MenuStore for MemoryStore {
    fn list_restaurants(&self) -> Result<Vec<RestaurantSummary>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .restaurants
            .values()
            .map(|r| RestaurantSummary {
                restaurant: r.clone(),
                dishes_count: tables.dishes_count(r.id),
            })
            .collect())
    }

    fn find_restaurant(&self, id: i32) -> Result<Option<Restaurant>, AppError> {
        Ok(self.lock()?.restaurants.get(&id).cloned())
    }

    fn create_restaurant(&self, new: NewRestaurant) -> Result<Restaurant, AppError> {
        let mut tables = self.lock()?;
        tables.last_restaurant_id += 1;
        let restaurant = Restaurant {
            id: tables.last_restaurant_id,
            title: new.title,
            description: new.description,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        log::debug!("Created restaurant {}", restaurant.id);
        Ok(restaurant)
    }

    fn update_restaurant(
        &self,
        id: i32,
        changes: RestaurantChanges,
    ) -> Result<Option<Restaurant>, AppError> {
        let mut tables = self.lock()?;
        Ok(tables.restaurants.get_mut(&id).map(|restaurant| {
            changes.apply_to(restaurant);
            restaurant.clone()
        }))
    }

    fn delete_restaurant(&self, id: i32) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        if !tables.restaurants.contains_key(&id) {
            return Ok(false);
        }
        let owned = tables.dishes_count(id);
        if owned > 0 {
            return Err(restaurant_has_dishes(id, owned));
        }
        tables.restaurants.remove(&id);
        Ok(true)
    }

    fn dishes_of_restaurant(&self, restaurant_id: i32) -> Result<Vec<Dish>, AppError> {
        Ok(self
            .lock()?
            .dishes
            .values()
            .filter(|d| d.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    fn list_dishes(&self) -> Result<Vec<Dish>, AppError> {
        Ok(self.lock()?.dishes.values().cloned().collect())
    }

    fn find_dish(&self, id: i32) -> Result<Option<Dish>, AppError> {
        Ok(self.lock()?.dishes.get(&id).cloned())
    }

    fn create_dish(&self, new: NewDish) -> Result<Dish, AppError> {
        let mut tables = self.lock()?;
        if !tables.restaurants.contains_key(&new.restaurant_id) {
            return Err(AppError::restaurant_must_exist());
        }
        tables.last_dish_id += 1;
        let dish = Dish {
            id: tables.last_dish_id,
            title: new.title,
            dish_type: new.dish_type,
            ingredients: new.ingredients,
            description: new.description,
            price: new.price,
            restaurant_id: new.restaurant_id,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        tables.dishes.insert(dish.id, dish.clone());
        log::debug!("Created dish {} for restaurant {}", dish.id, dish.restaurant_id);
        Ok(dish)
    }

    fn update_dish(&self, id: i32, changes: DishChanges) -> Result<Option<Dish>, AppError> {
        let mut tables = self.lock()?;
        if !tables.dishes.contains_key(&id) {
            return Ok(None);
        }
        if let Some(restaurant_id) = changes.restaurant_id {
            if !tables.restaurants.contains_key(&restaurant_id) {
                return Err(AppError::restaurant_must_exist());
            }
        }
        Ok(tables.dishes.get_mut(&id).map(|dish| {
            changes.apply_to(dish);
            dish.clone()
        }))
    }

    fn delete_dish(&self, id: i32) -> Result<bool, AppError> {
        Ok(self.lock()?.dishes.remove(&id).is_some())
    }
}

pub(crate) fn restaurant_has_dishes(id: i32, count: i64) -> AppError {
    AppError::Conflict(format!(
        "restaurant {} still has {} dishes and cannot be deleted",
        id, count
    ))
}
