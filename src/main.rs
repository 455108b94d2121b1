use gst_invoice_rust::{
    api::{self, AppState},
    create_pool,
    db::{run_migrations, PgInvoiceStore},
    render::PdfRenderer,
    AppConfig, InvoiceIssuer,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    if config.database.run_migrations {
        run_migrations(&pool).await?;
        info!("Database migrations applied");
    }

    let issuer = Arc::new(InvoiceIssuer::new(
        PgInvoiceStore::new(pool.clone()),
        Arc::new(PdfRenderer::new()),
        &config.issuer,
    ));

    let app = api::router(AppState { pool, issuer }).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/invoices/purchase  - 匹配采购流水并开具发票 (PDF)");
    info!("  POST /api/invoices/customer  - 客户发票 (PDF)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
