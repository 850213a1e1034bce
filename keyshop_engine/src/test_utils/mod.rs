mod fixtures;
mod prepare_env;

pub use fixtures::{fund_wallet, product_with_stock};
pub use prepare_env::{create_database, new_test_database, prepare_test_env, random_db_path, run_migrations};
