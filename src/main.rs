mod changefeed;
mod context;
mod core;
mod database;
mod device;
mod error;
mod handlers;
mod impls;
mod response;

use actix_web::web::{delete, get, post, put, resource, scope, Data};
use actix_web::HttpServer;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;

use changefeed::{run_listener, FeedCache};
use device::DeviceStore;
use impls::mailer::smtp::SmtpMailer;
use impls::tokener::jwt::JWT;

#[derive(Debug, Clone)]
pub struct AdminEmail(pub String);

#[derive(Debug, Clone)]
pub struct InquiryInbox(pub String);

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();
    env_logger::init();
    let database_url = dotenv::var("DATABASE_URL").expect("environment variable DATABASE_URL not been set");
    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_owned());
    let admin_email = AdminEmail(dotenv::var("ADMIN_EMAIL").expect("environment variable ADMIN_EMAIL not been set"));
    let inquiry_inbox = InquiryInbox(dotenv::var("INQUIRY_INBOX").unwrap_or_else(|_| admin_email.0.clone()));
    let device_store_path = dotenv::var("DEVICE_STORE_PATH").unwrap_or_else(|_| "./device-state".to_owned());
    let jwt_secret = dotenv::var("JWT_SECRET").expect("environment variable JWT_SECRET not been set");
    let smtp_relay = dotenv::var("SMTP_RELAY").expect("environment variable SMTP_RELAY not been set");
    let smtp_username = dotenv::var("SMTP_USERNAME").expect("environment variable SMTP_USERNAME not been set");
    let smtp_password = dotenv::var("SMTP_PASSWORD").expect("environment variable SMTP_PASSWORD not been set");
    let mail_from = dotenv::var("MAIL_FROM").expect("environment variable MAIL_FROM not been set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    sqlx::migrate!().run(&pool).await.expect("failed to run migrations");
    let devices = Data::new(DeviceStore::new(&device_store_path).expect("failed to open device store"));
    let cache = Data::new(FeedCache::new());
    let mailer = Data::new(
        SmtpMailer::new(&smtp_relay, smtp_username, smtp_password, &mail_from).expect("failed to build smtp mailer"),
    );
    let jwt = Data::new(JWT::new(jwt_secret.into_bytes()));
    let (changes_tx, _) = broadcast::channel(64);

    {
        let pool = pool.clone();
        let cache = cache.clone().into_inner();
        let changes_tx = changes_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = run_listener(pool, cache, changes_tx).await {
                log::error!("change feed listener stopped: {}", e);
            }
        });
    }

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(Data::new(pool.clone()))
            .app_data(devices.clone())
            .app_data(cache.clone())
            .app_data(mailer.clone())
            .app_data(jwt.clone())
            .app_data(Data::new(admin_email.clone()))
            .app_data(Data::new(inquiry_inbox.clone()))
            .app_data(Data::new(changes_tx.clone()))
            .service(resource("session").route(get().to(handlers::auth::session)))
            .service(resource("feed").route(get().to(handlers::feed::feed)))
            .service(resource("changes").route(get().to(handlers::feed::changes)))
            .service(
                scope("surveys").route("", post().to(handlers::survey::create)).service(
                    scope("{survey_id}")
                        .route("", get().to(handlers::survey::detail))
                        .route("", delete().to(handlers::survey::delete))
                        .route("vote", post().to(handlers::survey::vote))
                        .route("like", post().to(handlers::survey::like))
                        .route("watch", post().to(handlers::survey::watch))
                        .route("view", post().to(handlers::survey::view))
                        .service(
                            scope("comments")
                                .route("", get().to(handlers::comment::list))
                                .route("", post().to(handlers::comment::create)),
                        ),
                ),
            )
            .service(
                scope("comments").service(
                    scope("{comment_id}")
                        .route("", put().to(handlers::comment::edit))
                        .route("", delete().to(handlers::comment::delete))
                        .route("reactions", post().to(handlers::comment::react)),
                ),
            )
            .service(
                resource("inquiries")
                    .route(post().to(handlers::inquiry::create))
                    .route(get().to(handlers::inquiry::list)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
