use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use prize_draw_backend::{
    AppError,
    config::Config,
    database::{create_pool, run_migrations},
    external::{
        DatabaseDocumentStore, DatabaseShippingSink, DocumentStore, MemoryDocumentStore,
        MemoryShippingSink, ShippingSink,
    },
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    models::PrizeDocument,
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config =
        Config::from_toml().map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 存储: 未配置数据库时使用进程内存储
    let (document_store, shipping_sink): (Arc<dyn DocumentStore>, Arc<dyn ShippingSink>) =
        if config.database.url.is_empty() {
            log::warn!("database.url is empty, using in-memory stores");
            (
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(MemoryShippingSink::new()),
            )
        } else {
            let pool = create_pool(&config.database).await?;
            run_migrations(&pool).await?;
            (
                Arc::new(DatabaseDocumentStore::new(pool.clone())),
                Arc::new(DatabaseShippingSink::new(pool)),
            )
        };

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 奖池账本
    let ledger = InventoryLedger::new(
        document_store,
        config.draw.document_key.clone(),
        config.draw.max_prizes,
    );
    if let Err(e) = ledger.load_initial().await {
        log::error!("Failed to load prize document, starting with an empty pool: {e}");
    }
    ledger.attach_remote_updates();
    let _pool_watch = ledger.subscribe(Arc::new(|doc: &PrizeDocument| {
        log::debug!(
            "Prize pool changed: {} lines, {} remaining",
            doc.prizes.len(),
            doc.prizes.total_remaining()
        );
    }));

    // 创建服务
    let reveal_service = RevealService::new(RevealPolicy {
        high_ranks: config.draw.high_ranks.clone(),
        high_rank_delay: Duration::from_millis(config.draw.high_rank_reveal_delay_ms),
    });
    let draw_service = DrawService::new(
        ledger.clone(),
        reveal_service.clone(),
        config.draw.max_draw_count,
    );
    let shipping_service = ShippingService::new(shipping_sink, reveal_service.clone());
    let auth_service = AuthService::new(config.admin.clone(), jwt_service.clone());

    let _session_reset = reveal_service.on_complete(Arc::new(|id: &uuid::Uuid| {
        log::info!("Reveal session {id} finished, viewer reset to idle");
    }));

    tasks::spawn_all(reveal_service.clone(), config.draw.session_ttl_minutes);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let app_ledger = ledger.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::Data::new(app_ledger.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(reveal_service.clone()))
            .app_data(web::Data::new(shipping_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::draw_config)
                    .configure(handlers::reveal_config)
                    .configure(handlers::shipping_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    ledger.detach_remote_updates();
    Ok(())
}
