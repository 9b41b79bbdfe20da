use std::error::Error;

pub mod browser;
pub mod category;
pub mod config;
pub mod debounce;
pub mod html;
pub mod logging;
pub mod present;
pub mod query;
pub mod record;
pub mod store;
pub mod theme;

pub type AppResult<T> = Result<T, Box<dyn Error>>;
