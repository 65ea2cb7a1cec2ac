use common::Config;
// Re-export from infra crate
pub use infra::db::init_db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let pool = init_db(&config.database_url).await?;
    pool.close().await;
    println!("✅ migrations applied");
    Ok(())
}
