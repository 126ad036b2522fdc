//src/main.rs

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use onehub::{
    config::{AppConfig, AppState},
    routes::build_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    spawn_vencimento_scheduler(&app_state, &config);

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

/// Varredura periódica de vencimentos + reenvio da fila de notificações.
fn spawn_vencimento_scheduler(app_state: &AppState, config: &AppConfig) {
    if config.vencimento_scan_interval_secs == 0 {
        tracing::info!("Varredura de vencimentos desligada");
        return;
    }

    let service = app_state.notification_service.clone();
    let days_ahead = config.vencimento_days_ahead;
    let period = Duration::from_secs(config.vencimento_scan_interval_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match service.run_scheduled(days_ahead, Utc::now().date_naive()).await {
                Ok(created) => tracing::info!(created, "Varredura de vencimentos concluída"),
                Err(e) => tracing::error!("Falha na varredura de vencimentos: {:?}", e),
            }
        }
    });
}
