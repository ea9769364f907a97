use actix_web::web;

use crate::api::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1")
                .route("/{kind}", web::get().to(handlers::list_content))
                .route("/{kind}/{slug}", web::get().to(handlers::get_by_slug)),
        );
}
