use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::draw::get_status,
        handlers::draw::draw,
        handlers::reveal::get_session,
        handlers::reveal::disclose,
        handlers::reveal::show_summary,
        handlers::reveal::open_shipping,
        handlers::reveal::close_shipping,
        handlers::reveal::finish,
        handlers::reveal::cancel,
        handlers::shipping::submit,
        handlers::admin::get_document,
        handlers::admin::put_document,
        handlers::admin::add_prize,
        handlers::admin::update_prize,
        handlers::admin::remove_prize,
        handlers::admin::update_settings,
        handlers::admin::toggle_lock,
        handlers::admin::toggle_close,
        handlers::admin::save,
        handlers::admin::reload,
        handlers::admin::list_shipping,
        handlers::admin::purge_shipping,
    ),
    components(
        schemas(
            LoginRequest,
            AuthResponse,
            Prize,
            PrizePatch,
            DisplayMode,
            PrizeDocument,
            SettingsPatch,
            DrawMode,
            DrawnPrize,
            DrawRequest,
            DrawResponse,
            DrawStatusResponse,
            RevealState,
            RevealSummaryEntry,
            RevealItemView,
            RevealView,
            ShippingPrize,
            ShippingRecord,
            SubmitShippingRequest,
            ShippingRecordResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Admin authentication API"),
        (name = "draw", description = "Prize draw API"),
        (name = "reveal", description = "Reveal session API"),
        (name = "shipping", description = "Shipping information API"),
        (name = "admin", description = "Prize pool administration API"),
    ),
    info(
        title = "Prize Draw Backend API",
        version = "1.0.0",
        description = "Prize draw REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_draw_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/draw"));
        assert!(doc.paths.paths.contains_key("/reveal/{session_id}/disclose/{index}"));
        assert!(doc.paths.paths.contains_key("/admin/prizes/{rank}"));
    }
}
