use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::entities;

/// Establishes the database connection pool from application config.
pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .sqlx_logging(config.is_development());

    let db = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(db)
}

/// Creates any missing tables from the entity definitions.
///
/// Used for development and test databases (`auto_create_schema = true`);
/// production schemas are managed out of band.
pub async fn create_schema_if_missing(db: &DatabaseConnection) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    macro_rules! create_table {
        ($entity:expr) => {{
            let mut stmt = schema.create_table_from_entity($entity);
            stmt.if_not_exists();
            db.execute(builder.build(&stmt)).await?;
        }};
    }

    create_table!(entities::product::Entity);
    create_table!(entities::category::Entity);
    create_table!(entities::banner::Entity);
    create_table!(entities::blog_post::Entity);
    create_table!(entities::combo::Entity);
    create_table!(entities::coupon::Entity);
    create_table!(entities::coupon_usage::Entity);
    create_table!(entities::order::Entity);
    create_table!(entities::order_item::Entity);
    create_table!(entities::lead::Entity);

    info!("Schema ensured from entity definitions");
    Ok(())
}
