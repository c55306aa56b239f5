pub mod auth_service;
pub mod comment_service;
pub mod mail_service;
pub mod notification_service;
pub mod opportunity_service;
pub mod payment_service;
pub mod registration_service;
pub mod request_service;
pub mod resource_service;
pub mod upload_service;
pub mod user_service;
