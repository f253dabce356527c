use clap::Parser;
use tokio_util::sync::CancellationToken;

use codelens::assistant::AssistantClient;
use codelens::config::{CliArgs, Config};
use codelens::sandbox::Executor;
use codelens::web_server::build_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let Config {
        server: server_config,
        execution: execution_config,
        assistant: assistant_config,
    } = cli.to_config()?;

    let shutdown_token = CancellationToken::new();
    let executor = Executor::new(&execution_config, shutdown_token.clone());
    log::info!(
        "Workspaces will be created under {}",
        executor.workspace_root().display()
    );

    let assistant = AssistantClient::new(&assistant_config)?;
    if !assistant.is_configured() {
        log::warn!("No assistant API key configured, questions and corrections are disabled");
    }

    // ======= PREPARATION END, EXECUTION START =======

    let server = build_server(server_config, executor, assistant)?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
    }

    // 1. Kill in-flight executions so their handlers can answer
    shutdown_token.cancel();

    // 2. Shutdown actix-web server gracefully
    server_handle.stop(true).await;

    log::info!("Shutdown complete");
    Ok(())
}
