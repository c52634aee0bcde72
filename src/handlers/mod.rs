pub mod admin;
pub mod dishes;
pub mod health;
