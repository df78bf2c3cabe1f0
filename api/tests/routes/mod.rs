mod attendance_test;
mod health_test;
mod qrcode_test;
