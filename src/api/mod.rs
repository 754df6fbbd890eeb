pub mod error;
pub mod health;
pub mod invocations;
pub mod middleware;
pub mod openapi;

use actix_web::web;

/// Register every HTTP route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(invocations::configure)
        .configure(openapi::configure);
}
