pub mod compress;
pub mod download;
pub mod health;
