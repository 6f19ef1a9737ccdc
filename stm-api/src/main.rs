use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use stm_api::auth::hash_password;
use stm_api::config::{read_config, Settings};
use stm_api::domain::Role;
use stm_api::repositories::{NewUser, UserRepository, UserRepositoryImpl};
use stm_api::router;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::from_filename("./stm-api/.env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = read_config().expect("Failed to read configuration");

    let db_pool = PgPoolOptions::new().connect_lazy_with(config.database.with_db());

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    seed_admin(&db_pool, &config).await;

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    tracing::info!("Listening on {}", address);

    let app = router::create(db_pool, config).await;
    axum::serve(listener, app).await.expect("Failed to run server");
}

/// Creates the admin account from configuration when the user table is
/// empty, so a fresh deployment can be logged into.
async fn seed_admin(db_pool: &PgPool, config: &Settings) {
    let user_repo = UserRepositoryImpl::new(db_pool.clone());
    let user_count = user_repo
        .count_users()
        .await
        .expect("Failed to count users");
    if user_count > 0 {
        return;
    }

    let admin = NewUser::new(
        config.auth.admin_email.clone(),
        "Administrator".to_string(),
        hash_password(&config.auth.admin_password),
        Role::Admin,
    );
    let user = user_repo
        .create_user(&admin)
        .await
        .expect("Failed to seed admin user");
    tracing::info!("Seeded admin account: {}", user.email);
}
