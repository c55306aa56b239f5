pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod opportunities;
pub mod registrations;
pub mod requests;
pub mod resources;
pub mod swagger;
pub mod users;
