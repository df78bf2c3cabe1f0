pub mod m202510160001_create_attendance_codes;
pub mod m202510160002_create_attendance_records;
