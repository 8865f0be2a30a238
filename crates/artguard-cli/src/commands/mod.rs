pub mod health;
pub mod protect;
pub mod show_config;
pub mod verify;
