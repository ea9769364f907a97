pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod images;
pub mod store;
pub mod tracing;

pub mod util {
    pub mod env;
}
