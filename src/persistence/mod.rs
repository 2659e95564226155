//! Database layer: pool, migrations, and the postgres order store.

mod orders;
mod pool;

pub use orders::PgOrderStore;
pub use pool::{create_pool_and_migrate, run_migrations};
pub use sqlx::PgPool;
