use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Opportunity Hub API",
        version = "1.0.0",
        description = "Job, contest and webinar board with a learning-resource hub.\n\n**Authentication:** write endpoints and personal views require a JWT Bearer token obtained from `/api/auth/login`, `/api/auth/register` or the Google sign-in flow."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::verify_token,
        crate::api::auth::google_auth,
        crate::api::auth::google_callback,

        // Health
        crate::api::health::health_check,

        // Opportunities
        crate::api::opportunities::list_opportunities,
        crate::api::opportunities::create_opportunity,
        crate::api::opportunities::get_opportunity,
        crate::api::opportunities::update_opportunity,
        crate::api::opportunities::delete_opportunity,

        // Registrations
        crate::api::registrations::create_order,
        crate::api::registrations::register,
        crate::api::registrations::my_registrations,
        crate::api::registrations::list_registrations,

        // Requests
        crate::api::requests::create_request,
        crate::api::requests::my_requests,
        crate::api::requests::requests_for_opportunity,
        crate::api::requests::download_resume,
        crate::api::requests::delete_request,

        // Resources
        crate::api::resources::list_resources,
        crate::api::resources::my_resources,
        crate::api::resources::get_resource,
        crate::api::resources::create_resource,
        crate::api::resources::update_resource,
        crate::api::resources::delete_resource,
        crate::api::resources::rate_resource,
        crate::api::resources::view_resource,

        // Comments
        crate::api::comments::add_opportunity_comment,
        crate::api::comments::opportunity_comments,
        crate::api::comments::add_resource_comment,
        crate::api::comments::resource_threads,
        crate::api::comments::delete_comment,

        // Notifications
        crate::api::notifications::list_notifications,
        crate::api::notifications::mark_read,

        // Users
        crate::api::users::get_me,
        crate::api::users::update_me,
        crate::api::users::bookmark_opportunity,
        crate::api::users::unbookmark_opportunity,
        crate::api::users::opportunity_bookmarks,
        crate::api::users::bookmark_resource,
        crate::api::users::unbookmark_resource,
        crate::api::users::resource_bookmarks,
        crate::api::users::my_opportunities,
        crate::api::users::get_user,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::AuthUser,
            crate::services::auth_service::VerifyTokenResponse,

            crate::api::health::HealthResponse,

            // Opportunities & registrations
            crate::models::OpportunityKind,
            crate::models::JobType,
            crate::models::OpportunityForm,
            crate::models::OpportunityResponse,
            crate::models::RegistrationForm,
            crate::models::RegistrationResponse,
            crate::services::payment_service::CreateOrderRequest,

            // Requests
            crate::api::requests::RequestUpload,
            crate::models::JobRequestResponse,
            crate::models::MyRequestResponse,

            // Resources
            crate::models::ResourceLink,
            crate::models::Rating,
            crate::models::ResourceSort,
            crate::models::ResourceRequest,
            crate::models::RateRequest,
            crate::models::ResourceResponse,

            // Comments & notifications
            crate::models::CommentRequest,
            crate::models::CommentResponse,
            crate::models::CommentThread,
            crate::models::NotificationOpportunityRef,
            crate::models::NotificationResourceRef,
            crate::models::NotificationResponse,

            // Users
            crate::models::UserSummary,
            crate::models::ProfileResponse,
            crate::models::PublicProfile,
            crate::models::UpdateProfileRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Local email/password accounts and Google sign-in."),
        (name = "Health", description = "Liveness probe."),
        (name = "Opportunities", description = "Jobs, contests and webinars. Listing is public; everything else needs a token."),
        (name = "Registrations", description = "Contest and webinar registrations, including Razorpay orders for paid events."),
        (name = "Requests", description = "Job applications with an uploaded resume."),
        (name = "Resources", description = "Learning resources with ratings and view counts."),
        (name = "Comments", description = "Comments on opportunities and threaded comments on resources."),
        (name = "Notifications", description = "Broadcast notifications about new postings."),
        (name = "Users", description = "Profiles, bookmarks and the caller's own postings."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_routes_and_security() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"]["/api/opportunities"].is_object());
        assert!(json["paths"]["/api/resources/{id}/rate"]["patch"].is_object());
        assert!(json["paths"]["/api/users/{id}"]["get"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
