pub mod attendance_code;
pub mod attendance_record;
pub mod session_kind;

pub use attendance_code::Entity as AttendanceCode;
pub use attendance_record::Entity as AttendanceRecord;
pub use session_kind::SessionKind;
