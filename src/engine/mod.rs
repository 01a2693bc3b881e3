pub mod analytics;
pub mod auth;
pub mod drivers;
pub mod notifications;
pub mod packages;
pub mod pricing;
pub mod queue;
pub mod routes;
pub mod seed;
pub mod status;
pub mod tracking;
pub mod validation;
