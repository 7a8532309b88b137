use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::process;
use std::sync::Arc;

use tokengate::api;
use tokengate::auth::AuthMiddleware;
use tokengate::config::AppConfig;
use tokengate::db;
use tokengate::logger::Logger;
use tokengate::store::{CredentialStore, PostgresCredentialStore};
use tokengate::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 缺少签名密钥时直接退出，不对外服务
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置错误: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init(&config) {
        eprintln!("初始化日志系统失败: {}", e);
    }

    info!("应用程序启动");

    // 连接数据库
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库连接错误: {}", e)))?;

    db::initialize_db(pool.clone()).await.map_err(|e| {
        error!("数据库初始化错误: {}", e);
        io::Error::new(io::ErrorKind::Other, format!("数据库初始化错误: {}", e))
    })?;

    let store: Arc<dyn CredentialStore> = Arc::new(PostgresCredentialStore::new(pool));
    let guard = AuthMiddleware::from_config(&config, store.clone());
    let app_state = web::Data::new(AppState::new(&config, store));

    info!(
        "服务器启动在 http://{} (回查用户: {})",
        config.bind_addr, config.resolve_identity
    );

    HttpServer::new(move || {
        let guard = guard.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(|cfg| api::configure(cfg, guard))
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
