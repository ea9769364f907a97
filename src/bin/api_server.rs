//! Read-only content API binary.

use studio_migrate::api::server::ApiServer;
use studio_migrate::error::report;
use studio_migrate::tracing::init_tracing;
use studio_migrate::util::env::init_env;

#[actix_web::main]
async fn main() {
    init_env();
    init_tracing("info,actix_web=info");
    let server = ApiServer::from_env();
    if let Err(err) = server.run().await {
        report(&err);
        std::process::exit(1);
    }
}
