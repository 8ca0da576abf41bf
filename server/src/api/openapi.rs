//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{applications, auth, health, loans, payments, users};
use crate::api::types::{PaginationMeta, SuccessResponse};
use crate::data::types::{ApplicationStatus, FeeStatus, IdentityStatus, Role};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RinTrack API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Loan tracking backend"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Session login and logout"),
        (name = "users", description = "Identities and roles"),
        (name = "loans", description = "Loan products"),
        (name = "applications", description = "Loan applications"),
        (name = "payments", description = "Application fee checkout and confirmation")
    ),
    paths(
        // Health
        health::health,
        // Auth
        auth::login,
        auth::logout,
        // Users
        users::register_user,
        users::get_own_role,
        users::list_users,
        users::change_role,
        users::update_profile,
        users::suspend_user,
        // Loans
        loans::create_loan,
        loans::update_loan,
        loans::delete_loan,
        // Applications
        applications::create_application,
        applications::list_pending,
        applications::list_approved,
        applications::update_status,
        applications::list_own,
        applications::cancel_application,
        // Payments
        payments::create_checkout_session,
        payments::payment_success,
    ),
    components(schemas(
        // API types
        PaginationMeta,
        SuccessResponse,
        // Enums
        Role,
        IdentityStatus,
        ApplicationStatus,
        FeeStatus,
        // Health
        health::HealthResponse,
        // Auth
        auth::LoginRequest,
        // Users
        users::types::UserDto,
        users::types::RoleResponse,
        users::types::RegisterUserRequest,
        users::types::ListUsersQuery,
        users::types::ChangeRoleRequest,
        users::types::UpdateProfileRequest,
        users::types::SuspendRequest,
        // Loans
        loans::types::LoanDto,
        loans::types::CreateLoanRequest,
        loans::types::UpdateLoanRequest,
        // Applications
        applications::types::ApplicationDto,
        applications::types::ApplicantDetails,
        applications::types::CreateApplicationRequest,
        applications::types::UpdateStatusRequest,
        // Payments
        payments::types::Borrower,
        payments::types::CreateCheckoutRequest,
        payments::types::CheckoutResponse,
        payments::types::PaymentSuccessResponse,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>RinTrack API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/auth/login", "/payment-success", "/users/{email}", "/loans/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
