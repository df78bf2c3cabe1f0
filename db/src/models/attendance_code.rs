use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};
use util::geofence::Geofence;
use uuid::Uuid;

use super::session_kind::SessionKind;
use crate::error::{AttendanceError, AttendanceResult, is_unique_violation};
use crate::payload;

/// A generated QR attendance code. At most one row is active at a time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_kind: SessionKind,
    /// Payload embedded in the rendered QR image.
    #[sea_orm(column_type = "Text")]
    pub code: String,
    #[sea_orm(unique)]
    pub nonce: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_meters: Option<f64>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Parameters for issuing a new code.
#[derive(Debug, Clone)]
pub struct IssueCode {
    pub session_kind: SessionKind,
    /// `None` means no location restriction.
    pub geofence: Option<Geofence>,
    pub ttl: Duration,
    pub render_base_url: String,
}

impl IssueCode {
    fn validate(&self) -> AttendanceResult<()> {
        if self.ttl <= Duration::zero() {
            return Err(AttendanceError::Validation(
                "Code lifetime must be positive".into(),
            ));
        }
        if let Some(g) = &self.geofence {
            if !g.anchor().is_valid() {
                return Err(AttendanceError::Validation(
                    "Location latitude/longitude out of range".into(),
                ));
            }
            if !g.radius_meters.is_finite() || g.radius_meters < 0.0 {
                return Err(AttendanceError::Validation(
                    "Location radius must be a non-negative number of meters".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Model {
    /// Deactivates every active code and inserts a new active one, atomically.
    ///
    /// The previous code stops being redeemable immediately, even if it has
    /// not expired. A lost race against a concurrent issuance surfaces as
    /// [`AttendanceError::Conflict`]; the storage index never admits two
    /// active rows.
    pub async fn issue(
        db: &DatabaseConnection,
        params: IssueCode,
        now: DateTime<Utc>,
    ) -> AttendanceResult<Self> {
        params.validate()?;

        let txn = db.begin().await.map_err(AttendanceError::Deactivation)?;

        let deactivated = Entity::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .filter(Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(AttendanceError::Deactivation)?
            .rows_affected;

        let nonce = Uuid::new_v4().simple().to_string();
        let code = payload::build(&params.render_base_url, params.session_kind, &nonce);

        let active = ActiveModel {
            id: NotSet,
            session_kind: Set(params.session_kind),
            code: Set(code),
            nonce: Set(nonce),
            generated_at: Set(now),
            expires_at: Set(now + params.ttl),
            latitude: Set(params.geofence.map(|g| g.latitude)),
            longitude: Set(params.geofence.map(|g| g.longitude)),
            radius_meters: Set(params.geofence.map(|g| g.radius_meters)),
            is_active: Set(true),
        };

        let created = active.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AttendanceError::Conflict(
                    "Another QR code was issued at the same time; retry".into(),
                )
            } else {
                AttendanceError::Creation(e)
            }
        })?;

        txn.commit().await.map_err(AttendanceError::Creation)?;

        tracing::info!(
            code_id = created.id,
            session_kind = %created.session_kind,
            deactivated,
            expires_at = %created.expires_at,
            geofenced = created.latitude.is_some(),
            "Issued attendance code"
        );

        Ok(created)
    }

    /// Flips expired-but-still-active codes to inactive. Returns rows touched.
    pub async fn deactivate_expired(
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .filter(Column::IsActive.eq(true))
            .filter(Column::ExpiresAt.lt(now))
            .exec(db)
            .await?;
        if res.rows_affected > 0 {
            tracing::debug!(rows = res.rows_affected, "Deactivated expired attendance codes");
        }
        Ok(res.rows_affected)
    }

    /// The most recently generated active code, without any cleanup.
    pub async fn find_active(db: &DatabaseConnection) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::IsActive.eq(true))
            .order_by_desc(Column::GeneratedAt)
            .one(db)
            .await
    }

    /// Cleanup-on-read followed by [`Model::find_active`].
    ///
    /// A failed cleanup is logged and does not fail the lookup; the caller
    /// still compares `expires_at` against `now`.
    pub async fn current(
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        if let Err(e) = Self::deactivate_expired(db, now).await {
            tracing::warn!(error = %e, "Expired-code cleanup failed");
        }
        Self::find_active(db).await
    }

    /// The most recently generated code, active or not.
    pub async fn latest(db: &DatabaseConnection) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .order_by_desc(Column::GeneratedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    pub async fn find_by_nonce(db: &DatabaseConnection, nonce: &str) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Nonce.eq(nonce)).one(db).await
    }

    pub async fn active_count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::IsActive.eq(true))
            .count(db)
            .await
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before expiry, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// The code's geofence, when all three components were stored.
    pub fn geofence(&self) -> Option<Geofence> {
        match (self.latitude, self.longitude, self.radius_meters) {
            (Some(lat), Some(lng), Some(radius)) => Some(Geofence::new(lat, lng, radius)),
            _ => None,
        }
    }
}
