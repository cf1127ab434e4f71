pub mod analytics;
pub mod grading;
pub mod progress;
pub mod question;
pub mod session;
pub mod subscription;
