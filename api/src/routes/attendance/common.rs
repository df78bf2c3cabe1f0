use db::models::attendance_record::{DailyStats, Model as AttendanceRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RecordResponse {
    pub id: i64,
    pub student_id: String,
    pub session_type: String,
    pub code_id: Option<i64>,
    pub marked_at: String,
    pub marked_on: String,
}

impl From<AttendanceRecord> for RecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            session_type: r.session_kind.to_string(),
            code_id: r.code_id,
            marked_at: r.marked_at.to_rfc3339(),
            marked_on: r.marked_on.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    /// Substring of the student id.
    pub q: Option<String>,
    /// `check-in` or `check-out`.
    pub session_type: Option<String>,
    /// `marked_at`, `student_id`; prefix `-` for descending.
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct ListResponse {
    pub records: Vec<RecordResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DailyStatsResponse {
    pub date: String,
    pub total_records: u64,
    pub unique_students: u64,
    pub check_ins: u64,
    pub check_outs: u64,
}

impl From<DailyStats> for DailyStatsResponse {
    fn from(s: DailyStats) -> Self {
        Self {
            date: s.date.to_string(),
            total_records: s.total_records,
            unique_students: s.unique_students,
            check_ins: s.check_ins,
            check_outs: s.check_outs,
        }
    }
}
