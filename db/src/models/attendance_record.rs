use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, QueryOrder};
use serde::{Deserialize, Serialize};
use util::geofence::Coordinates;

use super::attendance_code;
use super::session_kind::SessionKind;
use crate::error::{AttendanceError, AttendanceResult, is_unique_violation};
use crate::payload;

/// One successful redemption. Never mutated after insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: String,
    pub session_kind: SessionKind,
    /// Code that was redeemed. Cleared if the code row is ever deleted.
    pub code_id: Option<i64>,
    pub marked_at: DateTime<Utc>,
    /// UTC calendar day of `marked_at`; part of the once-per-day key.
    pub marked_on: NaiveDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_code::Entity",
        from = "Column::CodeId",
        to = "super::attendance_code::Column::Id",
        on_delete = "SetNull"
    )]
    Code,
}

impl Related<super::attendance_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Code.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A student's scan.
#[derive(Debug, Clone)]
pub struct Redeem {
    pub payload: String,
    pub student_id: String,
    pub device_location: Option<Coordinates>,
}

/// Server-side checks that are optional per deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedemptionPolicy {
    /// Re-check the device location against the code's geofence.
    pub enforce_geofence: bool,
}

impl RedemptionPolicy {
    pub fn from_config() -> Self {
        Self {
            enforce_geofence: util::config::enforce_geofence(),
        }
    }
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub record: Model,
    pub code: attendance_code::Model,
}

impl Redemption {
    pub fn message(&self) -> String {
        format!("Successfully {}!", self.record.session_kind.past_tense())
    }
}

/// Paging, search and sort for [`Model::list`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Case-insensitive substring of the student id.
    pub q: Option<String>,
    pub session_kind: Option<SessionKind>,
    /// `marked_at` or `student_id`, `-` prefix for descending.
    pub sort: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

/// Per-day aggregate returned by [`Model::daily_stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_records: u64,
    pub unique_students: u64,
    pub check_ins: u64,
    pub check_outs: u64,
}

impl Model {
    /// Validates a scanned payload against the active code and appends a record.
    ///
    /// Checks run in a fixed order so the first failing one determines the
    /// error: input, active code, expiry, supersession, session kind,
    /// geofence (when enforced), then the once-per-day guard.
    pub async fn redeem(
        db: &DatabaseConnection,
        params: Redeem,
        now: DateTime<Utc>,
        policy: RedemptionPolicy,
    ) -> AttendanceResult<Redemption> {
        let payload_raw = params.payload.trim();
        let student_id = params.student_id.trim();
        if payload_raw.is_empty() || student_id.is_empty() {
            return Err(AttendanceError::Validation(
                "QR data and student ID are required".into(),
            ));
        }

        let Some(code) = attendance_code::Model::current(db, now).await? else {
            // cleanup-on-read may just have retired the code the student scanned
            return match attendance_code::Model::latest(db).await? {
                Some(last) if last.is_expired_at(now) => Err(AttendanceError::CodeExpired {
                    expires_at: last.expires_at,
                }),
                _ => Err(AttendanceError::NoActiveCode),
            };
        };

        if code.is_expired_at(now) {
            return Err(AttendanceError::CodeExpired {
                expires_at: code.expires_at,
            });
        }

        if let Some(nonce) = payload::extract_nonce(payload_raw) {
            if nonce != code.nonce {
                return match attendance_code::Model::find_by_nonce(db, &nonce).await? {
                    Some(old) => Err(AttendanceError::CodeExpired {
                        expires_at: old.expires_at.min(code.generated_at),
                    }),
                    None => Err(AttendanceError::InvalidCode),
                };
            }
        }

        if !payload::matches_kind(payload_raw, code.session_kind) {
            return Err(AttendanceError::InvalidCode);
        }

        if policy.enforce_geofence {
            if let Some(fence) = code.geofence() {
                let device = params
                    .device_location
                    .filter(Coordinates::is_valid)
                    .ok_or_else(|| {
                        AttendanceError::Validation("Device location is required".into())
                    })?;
                if !fence.contains(&device) {
                    return Err(AttendanceError::OutsideGeofence {
                        distance_m: fence.distance_to(&device),
                    });
                }
            }
        }

        let marked_on = now.date_naive();
        if Self::exists_for_day(db, student_id, code.session_kind, marked_on).await? {
            return Err(AttendanceError::AlreadyMarked {
                session_kind: code.session_kind,
            });
        }

        let record = ActiveModel {
            id: NotSet,
            student_id: Set(student_id.to_string()),
            session_kind: Set(code.session_kind),
            code_id: Set(Some(code.id)),
            marked_at: Set(now),
            marked_on: Set(marked_on),
        }
        .insert(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AttendanceError::AlreadyMarked {
                    session_kind: code.session_kind,
                }
            } else {
                AttendanceError::Persistence(e)
            }
        })?;

        tracing::info!(
            record_id = record.id,
            code_id = code.id,
            student_id = %record.student_id,
            session_kind = %record.session_kind,
            "Attendance marked"
        );

        Ok(Redemption { record, code })
    }

    pub async fn exists_for_day(
        db: &DatabaseConnection,
        student_id: &str,
        kind: SessionKind,
        day: NaiveDate,
    ) -> Result<bool, DbErr> {
        let n = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::SessionKind.eq(kind))
            .filter(Column::MarkedOn.eq(day))
            .count(db)
            .await?;
        Ok(n > 0)
    }

    /// Paged listing. Returns the page and the total number of matches.
    pub async fn list(
        db: &DatabaseConnection,
        query: &RecordQuery,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut condition = Condition::all();
        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q.to_lowercase());
            condition = condition.add(Expr::cust("LOWER(student_id)").like(&pattern));
        }
        if let Some(kind) = query.session_kind {
            condition = condition.add(Column::SessionKind.eq(kind));
        }

        let mut select = Entity::find().filter(condition);
        select = match query.sort.as_deref().map(str::trim) {
            Some("marked_at") => select.order_by_asc(Column::MarkedAt),
            Some("student_id") => select.order_by_asc(Column::StudentId),
            Some("-student_id") => select.order_by_desc(Column::StudentId),
            _ => select.order_by_desc(Column::MarkedAt),
        };
        select = select.order_by_desc(Column::Id);

        let per_page = query.per_page.clamp(1, 100);
        let paginator = select.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    /// Every record, newest first.
    pub async fn all(db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .order_by_desc(Column::MarkedAt)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    pub async fn for_student(db: &DatabaseConnection, student_id: &str) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::MarkedAt)
            .all(db)
            .await
    }

    /// Aggregates records per UTC day and returns the `days` most recent days
    /// that have any, newest first. Gaps such as a term break do not count
    /// against the limit.
    pub async fn daily_stats(db: &DatabaseConnection, days: u32) -> Result<Vec<DailyStats>, DbErr> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let rows = Entity::find().all(db).await?;

        let mut per_day: BTreeMap<NaiveDate, (DailyStats, HashSet<String>)> = BTreeMap::new();
        for row in rows {
            let (stats, students) = per_day.entry(row.marked_on).or_insert_with(|| {
                (
                    DailyStats {
                        date: row.marked_on,
                        total_records: 0,
                        unique_students: 0,
                        check_ins: 0,
                        check_outs: 0,
                    },
                    HashSet::new(),
                )
            });
            stats.total_records += 1;
            match row.session_kind {
                SessionKind::CheckIn => stats.check_ins += 1,
                SessionKind::CheckOut => stats.check_outs += 1,
            }
            students.insert(row.student_id);
        }

        Ok(per_day
            .into_values()
            .rev()
            .take(days as usize)
            .map(|(mut stats, students)| {
                stats.unique_students = students.len() as u64;
                stats
            })
            .collect())
    }

    /// Fails with [`AttendanceError::NotFound`] when no such record exists.
    pub async fn delete_by_id(db: &DatabaseConnection, id: i64) -> AttendanceResult<()> {
        let res = Entity::delete_by_id(id).exec(db).await?;
        if res.rows_affected == 0 {
            return Err(AttendanceError::NotFound("Attendance record not found".into()));
        }
        Ok(())
    }

    pub async fn count_for_code(db: &DatabaseConnection, code_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::CodeId.eq(code_id))
            .count(db)
            .await
    }
}
