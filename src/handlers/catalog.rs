//! Catalog endpoints: public browsing plus admin management.
//!
//! Public listings hide inactive records; an allow-listed admin hitting the
//! same routes sees everything, so the storefront and the back office share
//! one read path.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{is_admin, AdminUser, OptionalAuthUser};
use crate::entities::{category, combo, product};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::services::catalog::{
    CreateCategoryInput, CreateComboInput, CreateProductInput, UpdateProductInput,
};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(m: product::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            description: m.description,
            price: m.price,
            image_url: m.image_url,
            category_id: m.category_id,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl From<category::Model> for CategoryResponse {
    fn from(m: category::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            image_url: m.image_url,
            is_active: m.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComboResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_ids: serde_json::Value,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl From<combo::Model> for ComboResponse {
    fn from(m: combo::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            product_ids: m.product_ids,
            price: m.price,
            image_url: m.image_url,
            is_active: m.is_active,
        }
    }
}

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Products", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let include_inactive = is_admin(&state.config.admin_allow_list, user.as_ref());
    let products = state
        .services
        .catalog
        .list_products(include_inactive)
        .await
        .map_err(map_service_error)?;
    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(body))
}

/// Fetch one product by slug
#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found")
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let include_inactive = is_admin(&state.config.admin_allow_list, user.as_ref());
    let found = state
        .services
        .catalog
        .get_product_by_slug(&slug, include_inactive)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(found)))
}

/// List categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories", body = [CategoryResponse])),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let include_inactive = is_admin(&state.config.admin_allow_list, user.as_ref());
    let categories = state
        .services
        .catalog
        .list_categories(include_inactive)
        .await
        .map_err(map_service_error)?;
    let body: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(success_response(body))
}

/// List combo bundles
#[utoipa::path(
    get,
    path = "/api/v1/combos",
    responses((status = 200, description = "Combos", body = [ComboResponse])),
    tag = "catalog"
)]
pub async fn list_combos(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let include_inactive = is_admin(&state.config.admin_allow_list, user.as_ref());
    let combos = state
        .services
        .catalog
        .list_combos(include_inactive)
        .await
        .map_err(map_service_error)?;
    let body: Vec<ComboResponse> = combos.into_iter().map(ComboResponse::from).collect();
    Ok(success_response(body))
}

/// Create a product (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 409, description = "Slug already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ProductResponse::from(product)))
}

/// Update a product (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Create a category (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Slug already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(CategoryResponse::from(category)))
}

/// Delete a category (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has products")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Create a combo bundle (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/combos",
    request_body = CreateComboInput,
    responses(
        (status = 201, description = "Combo created", body = ComboResponse),
        (status = 400, description = "Combo references unknown products")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_combo(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateComboInput>,
) -> Result<impl IntoResponse, ApiError> {
    let combo = state
        .services
        .catalog
        .create_combo(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ComboResponse::from(combo)))
}

/// Delete a combo bundle (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/admin/combos/{id}",
    params(("id" = Uuid, Path, description = "Combo id")),
    responses(
        (status = 204, description = "Combo deleted"),
        (status = 404, description = "Combo not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_combo(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_combo(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .route("/categories", get(list_categories))
        .route("/combos", get(list_combos))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/products", post(create_product))
        .route(
            "/admin/products/:id",
            put(update_product).delete(delete_product),
        )
        .route("/admin/categories", post(create_category))
        .route("/admin/categories/:id", delete(delete_category))
        .route("/admin/combos", post(create_combo))
        .route("/admin/combos/:id", delete(delete_combo))
}
