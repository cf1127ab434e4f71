pub mod analytics_dto;
pub mod grading_dto;
pub mod progress_dto;
pub mod question_dto;
pub mod session_dto;
pub mod subscription_dto;
