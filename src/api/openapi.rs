//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{checkouts, equipment, health};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "1.0.0",
        description = "Training equipment inventory and checkout REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Checkouts
        checkouts::list_checkouts,
        checkouts::get_checkout,
        checkouts::create_checkout,
        checkouts::update_checkout,
        checkouts::delete_checkout,
        checkouts::list_statuses,
        checkouts::update_overdue,
        checkouts::get_stats,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
    ),
    components(
        schemas(
            // Checkouts
            crate::models::checkout::CheckoutStatus,
            crate::models::checkout::CheckoutDetails,
            crate::models::checkout::CreateCheckout,
            crate::models::checkout::UpdateCheckout,
            crate::models::checkout::CheckoutStats,
            crate::models::CheckoutPage,
            checkouts::OverdueSweepResponse,
            // Equipment
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentShort,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Users
            crate::models::user::Role,
            crate::models::user::UserShort,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "checkouts", description = "Equipment checkout lifecycle"),
        (name = "equipment", description = "Equipment management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
