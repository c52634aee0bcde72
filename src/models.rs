use std::fmt;
use std::io::Write;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Integer;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::schema::{dishes, restaurants};

/// Kind of dish. Stored as an integer code equal to the variant's position
/// in [`DishType::ALL`]; the order must never change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Integer)]
#[serde(rename_all = "snake_case")]
pub enum DishType {
    European,
    PanAsian,
    Wok,
    NonAlcoholDrink,
    AlcoholDrink,
    Burger,
}

impl DishType {
    pub const ALL: [DishType; 6] = [
        DishType::European,
        DishType::PanAsian,
        DishType::Wok,
        DishType::NonAlcoholDrink,
        DishType::AlcoholDrink,
        DishType::Burger,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DishType::European => "european",
            DishType::PanAsian => "pan_asian",
            DishType::Wok => "wok",
            DishType::NonAlcoholDrink => "non_alcohol_drink",
            DishType::AlcoholDrink => "alcohol_drink",
            DishType::Burger => "burger",
        }
    }
}

impl fmt::Display for DishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DishType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid_dish_type(s))
    }
}

fn invalid_dish_type(value: impl fmt::Display) -> AppError {
    AppError::invalid("dish_type", format!("'{}' is not a valid dish_type", value))
}

impl ToSql<Integer, Pg> for DishType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(&self.code().to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Integer, Pg> for DishType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let code = <i32 as FromSql<Integer, Pg>>::from_sql(bytes)?;
        DishType::from_code(code).ok_or_else(|| format!("unknown dish_type code {}", code).into())
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Restaurant {
    pub id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = restaurants)]
pub struct RestaurantChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// The only restaurant attributes editable through the admin pages.
/// Anything else submitted with the form is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantForm {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl RestaurantForm {
    pub fn into_new(self, now: NaiveDateTime) -> NewRestaurant {
        NewRestaurant {
            title: self.title,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_changes(self, now: NaiveDateTime) -> RestaurantChanges {
        RestaurantChanges {
            title: self.title,
            description: self.description,
            updated_at: now,
        }
    }
}

impl RestaurantChanges {
    pub(crate) fn apply_to(self, restaurant: &mut Restaurant) {
        if let Some(title) = self.title {
            restaurant.title = Some(title);
        }
        if let Some(description) = self.description {
            restaurant.description = Some(description);
        }
        restaurant.updated_at = self.updated_at;
    }
}

#[derive(
    Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations, Serialize,
)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = dishes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Dish {
    pub id: i32,
    pub title: Option<String>,
    pub dish_type: Option<DishType>,
    pub ingredients: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub restaurant_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dishes)]
pub struct NewDish {
    pub title: Option<String>,
    pub dish_type: Option<DishType>,
    pub ingredients: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub restaurant_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial dish update; `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = dishes)]
pub struct DishChanges {
    pub title: Option<String>,
    pub dish_type: Option<DishType>,
    pub ingredients: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub restaurant_id: Option<i32>,
    pub updated_at: NaiveDateTime,
}

impl DishChanges {
    pub(crate) fn apply_to(self, dish: &mut Dish) {
        if let Some(title) = self.title {
            dish.title = Some(title);
        }
        if let Some(dish_type) = self.dish_type {
            dish.dish_type = Some(dish_type);
        }
        if let Some(ingredients) = self.ingredients {
            dish.ingredients = Some(ingredients);
        }
        if let Some(description) = self.description {
            dish.description = Some(description);
        }
        if let Some(price) = self.price {
            dish.price = Some(price);
        }
        if let Some(restaurant_id) = self.restaurant_id {
            dish.restaurant_id = restaurant_id;
        }
        dish.updated_at = self.updated_at;
    }
}

/// `dish_type` as submitted by clients: either the variant name or its
/// integer code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DishTypeParam {
    Code(i32),
    Name(String),
}

impl DishTypeParam {
    pub fn resolve(self) -> Result<DishType, AppError> {
        match self {
            DishTypeParam::Code(code) => {
                DishType::from_code(code).ok_or_else(|| invalid_dish_type(code))
            }
            DishTypeParam::Name(name) => name.parse(),
        }
    }
}

/// Dish attributes accepted by the JSON API. `type` and `components` are
/// older names for `dish_type` and `ingredients`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DishAttributes {
    pub title: Option<String>,
    #[serde(alias = "type")]
    pub dish_type: Option<DishTypeParam>,
    #[serde(alias = "components")]
    pub ingredients: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<BigDecimal>,
    pub restaurant_id: Option<i32>,
}

/// Prices arrive as decimal strings or JSON numbers. A number is parsed from
/// its shortest decimal text so `9.99` stays `9.99` instead of the binary
/// expansion of the float.
fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let text = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(D::Error::custom(format!(
                "invalid price {}, expected a decimal",
                other
            )));
        }
    };
    text.trim()
        .parse::<BigDecimal>()
        .map(Some)
        .map_err(|_| D::Error::custom(format!("invalid price {:?}, expected a decimal", text)))
}

impl DishAttributes {
    pub fn into_new_dish(self, now: NaiveDateTime) -> Result<NewDish, AppError> {
        let restaurant_id = self
            .restaurant_id
            .ok_or_else(AppError::restaurant_must_exist)?;
        let dish_type = self.dish_type.map(DishTypeParam::resolve).transpose()?;
        Ok(NewDish {
            title: self.title,
            dish_type,
            ingredients: self.ingredients,
            description: self.description,
            price: self.price,
            restaurant_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn into_changes(self, now: NaiveDateTime) -> Result<DishChanges, AppError> {
        let dish_type = self.dish_type.map(DishTypeParam::resolve).transpose()?;
        Ok(DishChanges {
            title: self.title,
            dish_type,
            ingredients: self.ingredients,
            description: self.description,
            price: self.price,
            restaurant_id: self.restaurant_id,
            updated_at: now,
        })
    }
}

/// Request body for dish create/update, either bare attributes or wrapped
/// under a `dish` (or `dishes`) key. Once a wrapper key is present the
/// attributes are read from it alone.
#[derive(Debug, Clone)]
pub struct DishPayload(DishAttributes);

const WRAPPER_KEYS: [&str; 2] = ["dish", "dishes"];

impl<'de> Deserialize<'de> for DishPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let mut body = serde_json::Value::deserialize(deserializer)?;
        let attrs = match body.as_object_mut() {
            Some(map) => match WRAPPER_KEYS.iter().find_map(|key| map.remove(*key)) {
                Some(wrapped) => serde_json::from_value(wrapped),
                None => serde_json::from_value(body),
            },
            None => serde_json::from_value(body),
        };
        attrs.map(DishPayload).map_err(D::Error::custom)
    }
}

impl DishPayload {
    pub fn into_attributes(self) -> DishAttributes {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    #[test]
    fn dish_type_codes_follow_declaration_order() {
        let codes: Vec<i32> = DishType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(DishType::from_code(2), Some(DishType::Wok));
        assert_eq!(DishType::from_code(6), None);
        assert_eq!(DishType::from_code(-1), None);
    }

    #[test]
    fn dish_type_names_match_serde() {
        for t in DishType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_string()));
            assert_eq!(t.as_str().parse::<DishType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_dish_type_name_is_invalid() {
        let err = "sushi".parse::<DishType>().unwrap_err();
        assert_eq!(err.to_string(), "dish_type 'sushi' is not a valid dish_type");
    }

    #[test]
    fn dish_type_param_accepts_name_or_code() {
        let by_name: DishTypeParam = serde_json::from_str("\"burger\"").unwrap();
        let by_code: DishTypeParam = serde_json::from_str("5").unwrap();
        assert_eq!(by_name.resolve().unwrap(), DishType::Burger);
        assert_eq!(by_code.resolve().unwrap(), DishType::Burger);
        assert!(DishTypeParam::Code(42).resolve().is_err());
    }

    #[test]
    fn payload_accepts_legacy_names_and_wrapper() {
        let body = r#"{"dishes": {"title": "Pad Thai", "type": "wok", "components": "noodles", "restaurant_id": 3}}"#;
        let attrs = serde_json::from_str::<DishPayload>(body)
            .unwrap()
            .into_attributes();
        assert_eq!(attrs.title.as_deref(), Some("Pad Thai"));
        assert_eq!(attrs.dish_type, Some(DishTypeParam::Name("wok".to_string())));
        assert_eq!(attrs.ingredients.as_deref(), Some("noodles"));
        assert_eq!(attrs.restaurant_id, Some(3));
    }

    #[test]
    fn payload_accepts_flat_attributes() {
        let body = r#"{"title": "Cola", "dish_type": "non_alcohol_drink", "price": "2.50", "restaurant_id": 1}"#;
        let attrs = serde_json::from_str::<DishPayload>(body)
            .unwrap()
            .into_attributes();
        assert_eq!(attrs.price, Some("2.50".parse::<BigDecimal>().unwrap()));
        assert_eq!(attrs.restaurant_id, Some(1));
    }

    #[test]
    fn wrapped_payload_does_not_fall_back_to_flat() {
        let body = r#"{"dish": {"price": "cheap", "restaurant_id": 1}}"#;
        assert!(serde_json::from_str::<DishPayload>(body).is_err());
    }

    #[test]
    fn numeric_price_keeps_its_decimal_text() {
        let body = r#"{"price": 9.99, "restaurant_id": 1}"#;
        let attrs = serde_json::from_str::<DishPayload>(body)
            .unwrap()
            .into_attributes();
        assert_eq!(attrs.price, Some("9.99".parse::<BigDecimal>().unwrap()));
        assert_eq!(attrs.price.unwrap().to_string(), "9.99");

        let body = r#"{"price": 12, "restaurant_id": 1}"#;
        let attrs = serde_json::from_str::<DishPayload>(body)
            .unwrap()
            .into_attributes();
        assert_eq!(attrs.price.unwrap().to_string(), "12");
    }

    #[test]
    fn null_price_is_absent() {
        let attrs = serde_json::from_str::<DishPayload>(r#"{"price": null}"#)
            .unwrap()
            .into_attributes();
        assert_eq!(attrs.price, None);
    }

    #[test]
    fn new_dish_requires_restaurant() {
        let attrs = DishAttributes {
            title: Some("Burger".to_string()),
            ..Default::default()
        };
        let err = attrs.into_new_dish(now()).unwrap_err();
        assert_eq!(err.to_string(), "restaurant must exist");
    }

    #[test]
    fn changes_only_touch_given_fields() {
        let created = now();
        let mut dish = Dish {
            id: 1,
            title: Some("Ramen".to_string()),
            dish_type: Some(DishType::PanAsian),
            ingredients: Some("noodles, broth".to_string()),
            description: Some("Hot".to_string()),
            price: Some("9.90".parse().unwrap()),
            restaurant_id: 1,
            created_at: created,
            updated_at: created,
        };
        let attrs = DishAttributes {
            price: Some("11.00".parse().unwrap()),
            ..Default::default()
        };
        attrs.into_changes(now()).unwrap().apply_to(&mut dish);

        assert_eq!(dish.price, Some("11.00".parse().unwrap()));
        assert_eq!(dish.title.as_deref(), Some("Ramen"));
        assert_eq!(dish.dish_type, Some(DishType::PanAsian));
        assert_eq!(dish.created_at, created);
    }
}
