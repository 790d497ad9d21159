//! OpenAPI documentation assembly.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
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
        title = "Storefront API",
        version = "0.1.0",
        description = "E-commerce storefront and admin backend: catalog, checkout, coupons, content, and B2B leads"
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    modifiers(&SecurityAddon),
    paths(
        crate::handlers::coupons::validate_coupon,
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::orders::checkout,
        crate::handlers::orders::verify_payment,
        crate::handlers::orders::list_account_orders,
        crate::handlers::orders::delete_account_order,
        crate::handlers::catalog::list_products,
        crate::handlers::catalog::get_product,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::list_combos,
        crate::handlers::catalog::create_product,
        crate::handlers::catalog::update_product,
        crate::handlers::catalog::delete_product,
        crate::handlers::catalog::create_category,
        crate::handlers::catalog::delete_category,
        crate::handlers::catalog::create_combo,
        crate::handlers::catalog::delete_combo,
        crate::handlers::content::list_banners,
        crate::handlers::content::list_blog_posts,
        crate::handlers::content::get_blog_post,
        crate::handlers::content::create_banner,
        crate::handlers::content::delete_banner,
        crate::handlers::content::create_blog_post,
        crate::handlers::content::update_blog_post,
        crate::handlers::leads::create_lead,
        crate::handlers::leads::list_leads,
        crate::handlers::uploads::upload_media,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::coupon::DiscountType,
        crate::services::coupons::CouponRejection,
        crate::services::coupons::CreateCouponInput,
        crate::services::coupons::UpdateCouponInput,
        crate::services::orders::OrderView,
        crate::services::orders::OrderItemView,
        crate::services::orders::OrderItemInput,
        crate::services::orders::OrderDeletion,
        crate::services::catalog::CreateProductInput,
        crate::services::catalog::UpdateProductInput,
        crate::services::catalog::CreateCategoryInput,
        crate::services::catalog::CreateComboInput,
        crate::services::content::CreateBannerInput,
        crate::services::content::CreateBlogPostInput,
        crate::services::content::UpdateBlogPostInput,
        crate::services::leads::CreateLeadInput,
        crate::handlers::coupons::ValidateCouponRequest,
        crate::handlers::coupons::ValidateCouponResponse,
        crate::handlers::coupons::CouponResponse,
        crate::handlers::orders::CheckoutRequest,
        crate::handlers::orders::CheckoutResponse,
        crate::handlers::orders::VerifyPaymentRequest,
        crate::handlers::orders::VerifyPaymentResponse,
        crate::handlers::orders::DeleteOrderResponse,
        crate::handlers::catalog::ProductResponse,
        crate::handlers::catalog::CategoryResponse,
        crate::handlers::catalog::ComboResponse,
        crate::handlers::content::BannerResponse,
        crate::handlers::content::BlogPostResponse,
        crate::handlers::leads::LeadResponse,
        crate::handlers::uploads::UploadResponse,
    )),
    tags(
        (name = "coupons", description = "Coupon validation"),
        (name = "checkout", description = "Checkout and payment confirmation"),
        (name = "account", description = "Signed-in customer's orders"),
        (name = "catalog", description = "Public catalog browsing"),
        (name = "content", description = "Banners and blog posts"),
        (name = "leads", description = "B2B lead capture"),
        (name = "admin", description = "Admin management (allow-listed users only)")
    )
)]
pub struct ApiDoc;

/// Mounts Swagger UI backed by the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
