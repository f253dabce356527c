use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::assistant::AssistantClient;
use crate::config::ServerConfig;
use crate::routes::{autocorrect_handler, debug_handler, health, json_error_handler};
use crate::sandbox::Executor;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 5000;

pub fn build_server(
    server_config: ServerConfig,
    executor: Executor,
    assistant: AssistantClient,
) -> std::io::Result<Server> {
    let executor = web::Data::new(executor);
    let assistant = web::Data::new(assistant);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(executor.clone())
            .app_data(assistant.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .service(debug_handler)
            .service(autocorrect_handler)
            .service(health)
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or(DEFAULT_BIND_ADDRESS.to_string()),
        server_config.bind_port.unwrap_or(DEFAULT_BIND_PORT),
    ))?
    .disable_signals()
    .run();

    Ok(server)
}
