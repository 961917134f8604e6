//! Reference data seeding.

use sellor_server::db::CategoryRepository;

/// Insert the default product categories.
///
/// Existing categories are left untouched, so this can be re-run.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing or the insert fails.
pub async fn categories() -> Result<u64, Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let inserted = CategoryRepository::new(&pool).seed_defaults().await?;

    tracing::info!("Seeded {} new categories", inserted);
    Ok(inserted)
}
