//! Vendor repository: stores, settings, Connect state, and subscription cache.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sellor_core::{Email, StoreSlug, SubscriptionStatus, UserId, UserRole, VendorId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{
    ConnectState, ProfileUpdate, StoreSettings, SubscriptionState, SubscriptionUpdate, User,
    Vendor,
};

const VENDOR_COLUMNS: &str = r"
    v.id, v.user_id, v.store_name, v.url_slug, v.contact_email, v.logo_url,
    v.accent_color, v.description, v.custom_domain, v.is_custom_domain_verified,
    v.is_active, v.stripe_account_id, v.stripe_charges_enabled,
    v.stripe_details_submitted, v.stripe_payouts_enabled, v.stripe_customer_id,
    v.stripe_subscription_id, v.subscription_status, v.subscription_period_end,
    v.cancel_at_period_end, v.plan_name, v.created_at
";

#[derive(sqlx::FromRow)]
struct VendorRow {
    id: VendorId,
    user_id: UserId,
    store_name: String,
    url_slug: StoreSlug,
    contact_email: Option<String>,
    logo_url: Option<String>,
    accent_color: Option<String>,
    description: Option<String>,
    custom_domain: Option<String>,
    is_custom_domain_verified: bool,
    is_active: bool,
    stripe_account_id: Option<String>,
    stripe_charges_enabled: bool,
    stripe_details_submitted: bool,
    stripe_payouts_enabled: bool,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    subscription_status: SubscriptionStatus,
    subscription_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    plan_name: String,
    created_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(r: VendorRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            store_name: r.store_name,
            slug: r.url_slug,
            contact_email: r.contact_email,
            logo_url: r.logo_url,
            accent_color: r.accent_color,
            description: r.description,
            custom_domain: r.custom_domain,
            is_custom_domain_verified: r.is_custom_domain_verified,
            is_active: r.is_active,
            connect: ConnectState {
                account_id: r.stripe_account_id,
                charges_enabled: r.stripe_charges_enabled,
                details_submitted: r.stripe_details_submitted,
                payouts_enabled: r.stripe_payouts_enabled,
            },
            subscription: SubscriptionState {
                customer_id: r.stripe_customer_id,
                subscription_id: r.stripe_subscription_id,
                status: r.subscription_status,
                current_period_end: r.subscription_period_end,
                cancel_at_period_end: r.cancel_at_period_end,
                plan_name: r.plan_name,
            },
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VendorWithOwnerRow {
    #[sqlx(flatten)]
    vendor: VendorRow,
    owner_email: String,
}

/// A vendor joined with its owner's login email, for the admin panel.
#[derive(Debug, Clone)]
pub struct VendorWithOwner {
    pub vendor: Vendor,
    pub owner_email: String,
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    default_shipping_rate_cents: i64,
    free_shipping_threshold_cents: Option<i64>,
    refund_policy: String,
    privacy_policy: String,
    terms_of_service: String,
}

impl From<SettingsRow> for StoreSettings {
    fn from(r: SettingsRow) -> Self {
        Self {
            default_shipping_rate_cents: r.default_shipping_rate_cents,
            free_shipping_threshold_cents: r.free_shipping_threshold_cents,
            refund_policy: r.refund_policy,
            privacy_policy: r.privacy_policy,
            terms_of_service: r.terms_of_service,
        }
    }
}

/// Repository for vendor database operations.
pub struct VendorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VendorRepository<'a> {
    /// Create a new vendor repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a vendor account, its store, and default settings in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_owner(
        &self,
        email: &Email,
        password_hash: &str,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<(User, Vendor), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (user_id, created_at): (UserId, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO sellor.user (email, password_hash, role)
            VALUES ($1, $2, 'vendor')
            RETURNING id, created_at
            ",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        let row = sqlx::query_as::<_, VendorRow>(&format!(
            r"
            WITH v AS (
                INSERT INTO sellor.vendor (user_id, store_name, url_slug, contact_email)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {VENDOR_COLUMNS} FROM v
            "
        ))
        .bind(user_id)
        .bind(store_name)
        .bind(slug)
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "subdomain"))?;

        sqlx::query("INSERT INTO sellor.store_settings (vendor_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let user = User {
            id: user_id,
            email: email.clone(),
            name: None,
            role: UserRole::Vendor,
            created_at,
        };

        Ok((user, Vendor::from(row)))
    }

    /// Whether a store already uses this subdomain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &StoreSlug) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sellor.vendor WHERE url_slug = $1)")
                .bind(slug)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Get a vendor by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        self.fetch_one_where("v.id = $1", id).await
    }

    /// Get the vendor owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user_id(&self, user_id: UserId) -> Result<Option<Vendor>, RepositoryError> {
        self.fetch_one_where("v.user_id = $1", user_id).await
    }

    /// Get a vendor by storefront subdomain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &StoreSlug) -> Result<Option<Vendor>, RepositoryError> {
        self.fetch_one_where("v.url_slug = $1", slug.as_str())
            .await
    }

    /// Get a vendor by custom domain (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_custom_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Vendor>, RepositoryError> {
        self.fetch_one_where("lower(v.custom_domain) = lower($1)", domain)
            .await
    }

    /// Find which store a Stripe subscription belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_id_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<VendorId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, VendorId>(
            "SELECT id FROM sellor.vendor WHERE stripe_subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// List every vendor with its owner's email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_owners(&self) -> Result<Vec<VendorWithOwner>, RepositoryError> {
        let rows = sqlx::query_as::<_, VendorWithOwnerRow>(&format!(
            r"
            SELECT {VENDOR_COLUMNS}, u.email AS owner_email
            FROM sellor.vendor v
            JOIN sellor.user u ON u.id = v.user_id
            ORDER BY v.created_at DESC
            "
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VendorWithOwner {
                vendor: Vendor::from(r.vendor),
                owner_email: r.owner_email,
            })
            .collect())
    }

    /// Activate or deactivate a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn set_active(&self, id: VendorId, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sellor.vendor SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record the plan name shown for a vendor's subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn set_plan_name(&self, id: VendorId, plan_name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sellor.vendor SET plan_name = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(plan_name)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Link a newly created Connect account to a vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the account is linked elsewhere.
    pub async fn set_connect_account(
        &self,
        id: VendorId,
        account_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE sellor.vendor
            SET stripe_account_id = $2,
                stripe_charges_enabled = FALSE,
                stripe_details_submitted = FALSE,
                stripe_payouts_enabled = FALSE,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(account_id)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "stripe account"))?;
        Ok(())
    }

    /// Refresh Connect onboarding flags from an `account.updated` event.
    ///
    /// Returns `false` if no vendor owns the account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_connect_state(
        &self,
        account_id: &str,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sellor.vendor
            SET stripe_charges_enabled = $2,
                stripe_details_submitted = $3,
                stripe_payouts_enabled = $4,
                updated_at = NOW()
            WHERE stripe_account_id = $1
            ",
        )
        .bind(account_id)
        .bind(charges_enabled)
        .bind(details_submitted)
        .bind(payouts_enabled)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply a partial subscription update. Absent fields keep their value.
    ///
    /// Returns `false` if the vendor does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the subscription id belongs to
    /// another vendor.
    pub async fn apply_subscription_update(
        &self,
        id: VendorId,
        update: &SubscriptionUpdate,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sellor.vendor
            SET subscription_status = COALESCE($2, subscription_status),
                subscription_period_end = COALESCE($3, subscription_period_end),
                cancel_at_period_end = COALESCE($4, cancel_at_period_end),
                stripe_subscription_id = COALESCE($5, stripe_subscription_id),
                stripe_customer_id = COALESCE($6, stripe_customer_id),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.status)
        .bind(update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(update.subscription_id.as_deref())
        .bind(update.customer_id.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "subscription"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Update storefront profile fields.
    ///
    /// Changing the custom domain resets its verification flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the custom domain is taken.
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn update_profile(
        &self,
        id: VendorId,
        update: &ProfileUpdate,
    ) -> Result<Vendor, RepositoryError> {
        let row = sqlx::query_as::<_, VendorRow>(&format!(
            r"
            WITH v AS (
                UPDATE sellor.vendor
                SET store_name = COALESCE($2, store_name),
                    description = COALESCE($3, description),
                    logo_url = COALESCE($4, logo_url),
                    accent_color = COALESCE($5, accent_color),
                    contact_email = COALESCE($6, contact_email),
                    is_custom_domain_verified = CASE
                        WHEN $7::text IS NOT NULL AND $7::text IS DISTINCT FROM custom_domain
                        THEN FALSE ELSE is_custom_domain_verified END,
                    custom_domain = COALESCE($7, custom_domain),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {VENDOR_COLUMNS} FROM v
            "
        ))
        .bind(id)
        .bind(update.store_name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.logo_url.as_deref())
        .bind(update.accent_color.as_deref())
        .bind(update.contact_email.as_deref())
        .bind(update.custom_domain.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "custom domain"))?;

        row.map(Vendor::from).ok_or(RepositoryError::NotFound)
    }

    /// Get a store's settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store has no settings row.
    pub async fn get_settings(&self, id: VendorId) -> Result<StoreSettings, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            SELECT default_shipping_rate_cents, free_shipping_threshold_cents,
                   refund_policy, privacy_policy, terms_of_service
            FROM sellor.store_settings
            WHERE vendor_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(StoreSettings::from).ok_or(RepositoryError::NotFound)
    }

    /// Replace a store's settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_settings(
        &self,
        id: VendorId,
        settings: &StoreSettings,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sellor.store_settings (
                vendor_id, default_shipping_rate_cents, free_shipping_threshold_cents,
                refund_policy, privacy_policy, terms_of_service
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (vendor_id) DO UPDATE
            SET default_shipping_rate_cents = EXCLUDED.default_shipping_rate_cents,
                free_shipping_threshold_cents = EXCLUDED.free_shipping_threshold_cents,
                refund_policy = EXCLUDED.refund_policy,
                privacy_policy = EXCLUDED.privacy_policy,
                terms_of_service = EXCLUDED.terms_of_service,
                updated_at = NOW()
            ",
        )
        .bind(id)
        .bind(settings.default_shipping_rate_cents)
        .bind(settings.free_shipping_threshold_cents)
        .bind(&settings.refund_policy)
        .bind(&settings.privacy_policy)
        .bind(&settings.terms_of_service)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_one_where<T>(
        &self,
        predicate: &str,
        value: T,
    ) -> Result<Option<Vendor>, RepositoryError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send,
    {
        let row = sqlx::query_as::<_, VendorRow>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM sellor.vendor v WHERE {predicate}"
        ))
        .bind(value)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Vendor::from))
    }
}
