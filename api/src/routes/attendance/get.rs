//! Read-only ledger routes: paged listing, CSV export, per-student history
//! and daily statistics.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use chrono::{SecondsFormat, Utc};
use db::models::SessionKind;
use db::models::attendance_record::{Model as AttendanceRecord, RecordQuery};
use util::{config, state::AppState};

use super::common::{DailyStatsResponse, ListQuery, ListResponse, RecordResponse, StatsQuery};
use crate::response::ApiResponse;

const MAX_STATS_DAYS: u32 = 365;

/// GET `/api/attendance/records`
///
/// **Query**:
/// - `q` *(optional)*: substring of the student id, case-insensitive
/// - `session_type` *(optional)*: `check-in` | `check-out`
/// - `sort` *(optional)*: `marked_at` | `student_id` (prefix `-` for desc, default `-marked_at`)
/// - `page` *(default 1)*
/// - `per_page` *(default 20, max 100)*
pub async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<ListResponse>>) {
    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(20).clamp(1, 100) as u64;

    let session_kind = match q.session_type.as_deref().filter(|s| !s.trim().is_empty()) {
        None => None,
        Some(s) => match SessionKind::from_str(s.trim()) {
            Ok(k) => Some(k),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("Invalid session_type")),
                );
            }
        },
    };

    let query = RecordQuery {
        q: q.q,
        session_kind,
        sort: q.sort,
        page,
        per_page,
    };

    match AttendanceRecord::list(state.db(), &query).await {
        Ok((rows, total)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                ListResponse {
                    records: rows.into_iter().map(RecordResponse::from).collect(),
                    page: page as i32,
                    per_page: per_page as i32,
                    total: total as i32,
                },
                "Attendance records retrieved",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list attendance records");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error retrieving attendance records")),
            )
        }
    }
}

/// GET `/api/attendance/student/{student_id}`
///
/// Every record of one student, newest first.
pub async fn list_student_records(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<Vec<RecordResponse>>>) {
    match AttendanceRecord::for_student(state.db(), student_id.trim()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                rows.into_iter().map(RecordResponse::from).collect(),
                "Student attendance retrieved",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, student_id = %student_id, "Failed to load student attendance");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error retrieving student attendance")),
            )
        }
    }
}

/// GET `/api/attendance/stats?days=30`
///
/// Per-day totals for the `days` most recent UTC days that have records
/// (default `STATS_WINDOW_DAYS`, max 365), newest first.
pub async fn get_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<DailyStatsResponse>>>) {
    let days = q
        .days
        .unwrap_or_else(config::stats_window_days)
        .clamp(1, MAX_STATS_DAYS);
    match AttendanceRecord::daily_stats(state.db(), days).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                stats.into_iter().map(DailyStatsResponse::from).collect(),
                "Attendance statistics retrieved",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, days, "Failed to compute attendance statistics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error computing statistics")),
            )
        }
    }
}

fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// GET `/api/attendance/records/export`
///
/// All records as a `text/csv` attachment with columns
/// `id,student_id,session_type,marked_at,marked_on,code_id`.
pub async fn export_records_csv(State(state): State<AppState>) -> (StatusCode, (HeaderMap, String)) {
    let mut headers = HeaderMap::new();

    let records = match AttendanceRecord::all(state.db()).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to export attendance records");
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                (headers, "Failed to export attendance records".to_string()),
            );
        }
    };

    let mut csv = String::from("id,student_id,session_type,marked_at,marked_on,code_id\n");
    for r in records {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.id,
            esc(&r.student_id),
            r.session_kind,
            r.marked_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            r.marked_on,
            r.code_id.map(|id| id.to_string()).unwrap_or_default(),
        ));
    }

    let filename = format!("attendance_{}.csv", Utc::now().format("%Y%m%d"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .unwrap_or(HeaderValue::from_static("attachment")),
    );

    (StatusCode::OK, (headers, csv))
}
