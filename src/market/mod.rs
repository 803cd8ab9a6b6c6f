pub mod provider;
pub mod series;
pub mod store;
