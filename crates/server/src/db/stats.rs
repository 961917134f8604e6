//! Platform-wide aggregates for the admin panel.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sellor_core::{SubscriptionStatus, VendorId};

use super::RepositoryError;

/// Headline counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct PlatformCounts {
    pub total_vendors: i64,
    pub active_vendors: i64,
    pub new_signups_today: i64,
    pub ai_generations: i64,
    pub paid_orders: i64,
    pub vendors_with_products: i64,
    pub vendors_with_custom_domain: i64,
    pub vendors_using_ai: i64,
    pub active_subscriptions: i64,
}

/// Kind of entry in the recent activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Signup,
    AiGeneration,
}

/// One recent event on the platform.
#[derive(Debug, Clone)]
pub struct Activity {
    pub kind: ActivityKind,
    pub vendor_id: VendorId,
    pub store_name: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    kind: String,
    vendor_id: VendorId,
    store_name: String,
    detail: Option<String>,
    at: DateTime<Utc>,
}

/// A vendor's subscription as listed in the admin panel.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRow {
    pub vendor_id: VendorId,
    pub store_name: String,
    pub email: String,
    pub plan_name: String,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub period_end: Option<DateTime<Utc>>,
}

/// Repository for cross-table admin queries.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count vendors, signups, generations, and adoption of platform features.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn platform_counts(&self) -> Result<PlatformCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, PlatformCounts>(
            r"
            SELECT
                (SELECT COUNT(*) FROM sellor.vendor) AS total_vendors,
                (SELECT COUNT(*) FROM sellor.vendor WHERE is_active) AS active_vendors,
                (SELECT COUNT(*) FROM sellor.vendor
                    WHERE created_at >= date_trunc('day', NOW())) AS new_signups_today,
                (SELECT COUNT(*) FROM sellor.ai_product_generation) AS ai_generations,
                (SELECT COUNT(*) FROM sellor.order WHERE payment_status = 'paid') AS paid_orders,
                (SELECT COUNT(DISTINCT vendor_id) FROM sellor.product) AS vendors_with_products,
                (SELECT COUNT(*) FROM sellor.vendor
                    WHERE custom_domain IS NOT NULL) AS vendors_with_custom_domain,
                (SELECT COUNT(DISTINCT vendor_id)
                    FROM sellor.ai_product_generation) AS vendors_using_ai,
                (SELECT COUNT(*) FROM sellor.vendor
                    WHERE subscription_status = 'active') AS active_subscriptions
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// The latest signups and AI generations, merged newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r"
            (
                SELECT 'signup' AS kind, v.id AS vendor_id, v.store_name,
                       NULL::TEXT AS detail, v.created_at AS at
                FROM sellor.vendor v
                ORDER BY v.created_at DESC
                LIMIT $1
            )
            UNION ALL
            (
                SELECT 'ai_generation', g.vendor_id, v.store_name,
                       g.generated_title, g.created_at
                FROM sellor.ai_product_generation g
                JOIN sellor.vendor v ON v.id = g.vendor_id
                ORDER BY g.created_at DESC
                LIMIT $1
            )
            ORDER BY at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Activity {
                kind: if r.kind == "signup" {
                    ActivityKind::Signup
                } else {
                    ActivityKind::AiGeneration
                },
                vendor_id: r.vendor_id,
                store_name: r.store_name,
                detail: r.detail,
                at: r.at,
            })
            .collect())
    }

    /// Every vendor's subscription, soonest renewal first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscriptions(&self) -> Result<Vec<SubscriptionRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r"
            SELECT v.id AS vendor_id, v.store_name, u.email, v.plan_name,
                   v.stripe_subscription_id AS subscription_id,
                   v.subscription_status AS status,
                   v.subscription_period_end AS period_end
            FROM sellor.vendor v
            JOIN sellor.user u ON u.id = v.user_id
            ORDER BY v.subscription_period_end ASC NULLS LAST, v.id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Sum of application fees over all paid orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_fees_collected(&self) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(application_fee_cents), 0)::BIGINT
            FROM sellor.order
            WHERE payment_status = 'paid'
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }
}
