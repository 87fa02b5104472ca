use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::purchases;

/// A single grant of paid access. Rows are soft-revoked, never deleted.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Provider payment intent id; unique per row
    pub payment_reference: String,
    pub customer_reference: Option<String>,
    pub entitlement_type: String,
    pub status: String,
    pub amount_paid: i64, // Minor units (e.g. 3900 for $39.00)
    pub currency: String,
    pub coupon_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = purchases)]
pub struct NewPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_reference: String,
    pub customer_reference: Option<String>,
    pub entitlement_type: String,
    pub status: String,
    pub amount_paid: i64,
    pub currency: String,
    pub coupon_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPurchase {
    /// Active lifetime entitlement with all timestamps set to now
    pub fn lifetime_pro(
        user_id: Uuid,
        payment_reference: String,
        customer_reference: Option<String>,
        amount_paid: i64,
        currency: String,
        coupon_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            payment_reference,
            customer_reference,
            entitlement_type: EntitlementType::LifetimePro.as_str().to_string(),
            status: PurchaseStatus::Active.as_str().to_string(),
            amount_paid,
            currency: currency.to_lowercase(),
            coupon_id,
            purchased_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_purchase(self) -> Purchase {
        Purchase {
            id: self.id,
            user_id: self.user_id,
            payment_reference: self.payment_reference,
            customer_reference: self.customer_reference,
            entitlement_type: self.entitlement_type,
            status: self.status,
            amount_paid: self.amount_paid,
            currency: self.currency,
            coupon_id: self.coupon_id,
            purchased_at: self.purchased_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseStatus {
    Active,
    Inactive,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Inactive => "inactive",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PurchaseStatus::Active),
            "inactive" => Some(PurchaseStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementType {
    LifetimePro,
}

impl EntitlementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementType::LifetimePro => "lifetime_pro",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "lifetime_pro" => Some(EntitlementType::LifetimePro),
            _ => None,
        }
    }
}

impl Purchase {
    /// True when this row grants lifetime access
    pub fn grants_lifetime_access(&self) -> bool {
        PurchaseStatus::from_string(&self.status) == Some(PurchaseStatus::Active)
            && EntitlementType::from_string(&self.entitlement_type)
                == Some(EntitlementType::LifetimePro)
    }

    pub async fn find_by_payment_reference(
        conn: &mut AsyncPgConnection,
        payment_reference: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::purchases::dsl;

        dsl::purchases
            .filter(dsl::payment_reference.eq(payment_reference))
            .select(Purchase::as_select())
            .first::<Self>(conn)
            .await
            .optional()
    }

    pub async fn find_active_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::purchases::dsl;

        dsl::purchases
            .filter(dsl::user_id.eq(user_id))
            .filter(dsl::status.eq(PurchaseStatus::Active.as_str()))
            .filter(dsl::entitlement_type.eq(EntitlementType::LifetimePro.as_str()))
            .order(dsl::purchased_at.desc())
            .select(Purchase::as_select())
            .first::<Self>(conn)
            .await
            .optional()
    }

    pub async fn find_by_user_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::purchases::dsl;

        dsl::purchases
            .filter(dsl::user_id.eq(user_id))
            .order(dsl::created_at.desc())
            .select(Purchase::as_select())
            .load::<Self>(conn)
            .await
    }

    /// Insert unless a row with the same payment reference exists.
    /// Returns `None` when the unique index swallowed a duplicate.
    pub async fn insert_if_absent(
        conn: &mut AsyncPgConnection,
        new_purchase: &NewPurchase,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::purchases::dsl;

        diesel::insert_into(dsl::purchases)
            .values(new_purchase)
            .on_conflict(dsl::payment_reference)
            .do_nothing()
            .returning(Purchase::as_returning())
            .get_result::<Self>(conn)
            .await
            .optional()
    }

    /// Move every active row of the user to `inactive`, returning the revoked rows
    pub async fn deactivate_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::purchases::dsl;

        diesel::update(
            dsl::purchases
                .filter(dsl::user_id.eq(user_id))
                .filter(dsl::status.eq(PurchaseStatus::Active.as_str())),
        )
        .set((
            dsl::status.eq(PurchaseStatus::Inactive.as_str()),
            dsl::updated_at.eq(Utc::now()),
        ))
        .returning(Purchase::as_returning())
        .get_results::<Self>(conn)
        .await
    }
}
