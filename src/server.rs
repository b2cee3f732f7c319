//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the matching engine
//! and MCP tool handler into a running server.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

use gita_match::config::GitaConfig;
use gita_match::GitaEngine;

use crate::tools::GitaTools;

/// Build the shared engine and load its assets up front so the first request is fast.
/// A failed warm-up is logged; requests retry initialization on their own.
async fn setup_engine(config: &GitaConfig) -> Result<Arc<GitaEngine>> {
    let engine = Arc::new(GitaEngine::from_config(config)?);
    tracing::info!(
        assets = %config.resolved_assets_dir().display(),
        providers = ?engine.providers(),
        "engine created"
    );
    if let Err(e) = engine.ensure_initialized().await {
        tracing::error!(error = %e, "engine warm-up failed, requests will report no match");
    }
    Ok(engine)
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: GitaConfig) -> Result<()> {
    tracing::info!("starting gita-match MCP server on stdio");

    let engine = setup_engine(&config).await?;

    let tools = GitaTools::new(engine);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: GitaConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting gita-match MCP server on HTTP");

    let engine = setup_engine(&config).await?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(GitaTools::new(Arc::clone(&engine))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
