pub mod config;
pub mod driver;
pub mod error;
pub mod harvest;
pub mod html;
pub mod navigate;
pub mod sink;
