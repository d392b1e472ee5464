use storefront_server::{Server, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志, 配置)
    let config = setup_environment()?;

    tracing::info!("🛒 Storefront server starting...");

    // 2. 初始化状态并启动 HTTP 服务器
    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
