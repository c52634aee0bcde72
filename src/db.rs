use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::AppError;
use crate::models::{Dish, DishChanges, NewDish, NewRestaurant, Restaurant, RestaurantChanges};
use crate::schema::{dishes, restaurants};
use crate::store::{MenuStore, RestaurantSummary, restaurant_has_dishes};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn build_pool(database_url: &str, max_size: u32) -> Result<DbPool, AppError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(max_size).build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Migration(e.to_string()))?;
    log::info!("Applied {} pending migrations", applied.len());
    Ok(())
}

/// Inserting or re-pointing a dish at a restaurant that does not exist
/// trips the foreign key; report it like any other validation failure.
fn map_dish_write(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            AppError::restaurant_must_exist()
        }
        other => other.into(),
    }
}

/// A dish inserted between the count and the delete still trips the foreign
/// key at READ COMMITTED; that is the same conflict as counting one.
fn map_restaurant_delete(id: i32, err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            restaurant_has_dishes(id, 1)
        }
        other => other.into(),
    }
}

/// Postgres-backed [`MenuStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }

    /// Builds the pool and brings the schema up to date.
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self, AppError> {
        let pool = build_pool(database_url, max_size)?;
        run_migrations(&pool)?;
        Ok(PgStore::new(pool))
    }

    fn conn(&self) -> Result<DbConn, AppError> {
        Ok(self.pool.get()?)
    }
}

impl MenuStore for PgStore {
    fn list_restaurants(&self) -> Result<Vec<RestaurantSummary>, AppError> {
        let conn = &mut self.conn()?;
        let all = restaurants::table
            .order(restaurants::id)
            .select(Restaurant::as_select())
            .load(conn)?;
        let counts: Vec<(i32, i64)> = dishes::table
            .group_by(dishes::restaurant_id)
            .select((dishes::restaurant_id, count_star()))
            .load(conn)?;

        Ok(all
            .into_iter()
            .map(|restaurant| {
                let dishes_count = counts
                    .iter()
                    .find(|(id, _)| *id == restaurant.id)
                    .map_or(0, |(_, n)| *n);
                RestaurantSummary {
                    restaurant,
                    dishes_count,
                }
            })
            .collect())
    }

    fn find_restaurant(&self, id: i32) -> Result<Option<Restaurant>, AppError> {
        let conn = &mut self.conn()?;
        Ok(restaurants::table
            .find(id)
            .select(Restaurant::as_select())
            .first(conn)
            .optional()?)
    }

    fn create_restaurant(&self, new: NewRestaurant) -> Result<Restaurant, AppError> {
        let conn = &mut self.conn()?;
        let restaurant = diesel::insert_into(restaurants::table)
            .values(&new)
            .returning(Restaurant::as_returning())
            .get_result(conn)?;
        log::debug!("Created restaurant {}", restaurant.id);
        Ok(restaurant)
    }

    fn update_restaurant(
        &self,
        id: i32,
        changes: RestaurantChanges,
    ) -> Result<Option<Restaurant>, AppError> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(restaurants::table.find(id))
            .set(&changes)
            .returning(Restaurant::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn delete_restaurant(&self, id: i32) -> Result<bool, AppError> {
        let conn = &mut self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let owned: i64 = dishes::table
                .filter(dishes::restaurant_id.eq(id))
                .count()
                .get_result(conn)?;
            if owned > 0 {
                return Err(restaurant_has_dishes(id, owned));
            }
            let deleted = diesel::delete(restaurants::table.find(id))
                .execute(conn)
                .map_err(|e| map_restaurant_delete(id, e))?;
            Ok(deleted > 0)
        })
    }

    fn dishes_of_restaurant(&self, restaurant_id: i32) -> Result<Vec<Dish>, AppError> {
        let conn = &mut self.conn()?;
        Ok(dishes::table
            .filter(dishes::restaurant_id.eq(restaurant_id))
            .order(dishes::id)
            .select(Dish::as_select())
            .load(conn)?)
    }

    fn list_dishes(&self) -> Result<Vec<Dish>, AppError> {
        let conn = &mut self.conn()?;
        Ok(dishes::table
            .order(dishes::id)
            .select(Dish::as_select())
            .load(conn)?)
    }

    fn find_dish(&self, id: i32) -> Result<Option<Dish>, AppError> {
        let conn = &mut self.conn()?;
        Ok(dishes::table
            .find(id)
            .select(Dish::as_select())
            .first(conn)
            .optional()?)
    }

    fn create_dish(&self, new: NewDish) -> Result<Dish, AppError> {
        let conn = &mut self.conn()?;
        let dish = diesel::insert_into(dishes::table)
            .values(&new)
            .returning(Dish::as_returning())
            .get_result(conn)
            .map_err(map_dish_write)?;
        log::debug!("Created dish {} for restaurant {}", dish.id, dish.restaurant_id);
        Ok(dish)
    }

    fn update_dish(&self, id: i32, changes: DishChanges) -> Result<Option<Dish>, AppError> {
        let conn = &mut self.conn()?;
        diesel::update(dishes::table.find(id))
            .set(&changes)
            .returning(Dish::as_returning())
            .get_result(conn)
            .optional()
            .map_err(map_dish_write)
    }

    fn delete_dish(&self, id: i32) -> Result<bool, AppError> {
        let conn = &mut self.conn()?;
        let deleted = diesel::delete(dishes::table.find(id)).execute(conn)?;
        Ok(deleted > 0)
    }
}
