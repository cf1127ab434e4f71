pub mod analytics_service;
pub mod grading_service;
pub mod payment_gateway;
pub mod progress_service;
pub mod question_service;
pub mod session_service;
pub mod subscription_service;
