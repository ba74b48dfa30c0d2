pub mod config;
pub mod copier;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod migrate;
pub mod model;
pub mod provenance;
pub mod registry;
pub mod store;
