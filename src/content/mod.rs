pub mod fetch;
pub mod mapping;
pub mod normalize;
pub mod rewrite;
pub mod sanitize;
pub mod schema;
