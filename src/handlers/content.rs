//! Storefront content endpoints: banners and blog posts.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{is_admin, AdminUser, OptionalAuthUser};
use crate::entities::{banner, blog_post};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::services::content::{CreateBannerInput, CreateBlogPostInput, UpdateBlogPostInput};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct BannerResponse {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

impl From<banner::Model> for BannerResponse {
    fn from(m: banner::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            image_url: m.image_url,
            link_url: m.link_url,
            position: m.position,
            is_active: m.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BlogPostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl From<blog_post::Model> for BlogPostResponse {
    fn from(m: blog_post::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            slug: m.slug,
            body: m.body,
            cover_image_url: m.cover_image_url,
            is_published: m.is_published,
            created_at: m.created_at,
        }
    }
}

/// List banners in display order
#[utoipa::path(
    get,
    path = "/api/v1/banners",
    responses((status = 200, description = "Banners", body = [BannerResponse])),
    tag = "content"
)]
pub async fn list_banners(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let include_inactive = is_admin(&state.config.admin_allow_list, user.as_ref());
    let banners = state
        .services
        .content
        .list_banners(include_inactive)
        .await
        .map_err(map_service_error)?;
    let body: Vec<BannerResponse> = banners.into_iter().map(BannerResponse::from).collect();
    Ok(success_response(body))
}

/// List blog posts; drafts are visible to admins only
#[utoipa::path(
    get,
    path = "/api/v1/blogs",
    responses((status = 200, description = "Blog posts", body = [BlogPostResponse])),
    tag = "content"
)]
pub async fn list_blog_posts(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let include_drafts = is_admin(&state.config.admin_allow_list, user.as_ref());
    let posts = state
        .services
        .content
        .list_blog_posts(include_drafts)
        .await
        .map_err(map_service_error)?;
    let body: Vec<BlogPostResponse> = posts.into_iter().map(BlogPostResponse::from).collect();
    Ok(success_response(body))
}

/// Fetch one blog post by slug
#[utoipa::path(
    get,
    path = "/api/v1/blogs/{slug}",
    params(("slug" = String, Path, description = "Blog post slug")),
    responses(
        (status = 200, description = "Blog post", body = BlogPostResponse),
        (status = 404, description = "Blog post not found")
    ),
    tag = "content"
)]
pub async fn get_blog_post(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let include_drafts = is_admin(&state.config.admin_allow_list, user.as_ref());
    let post = state
        .services
        .content
        .get_blog_post_by_slug(&slug, include_drafts)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BlogPostResponse::from(post)))
}

/// Create a banner (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/banners",
    request_body = CreateBannerInput,
    responses((status = 201, description = "Banner created", body = BannerResponse)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateBannerInput>,
) -> Result<impl IntoResponse, ApiError> {
    let banner = state
        .services
        .content
        .create_banner(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(BannerResponse::from(banner)))
}

/// Delete a banner (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner id")),
    responses(
        (status = 204, description = "Banner deleted"),
        (status = 404, description = "Banner not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .content
        .delete_banner(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Create a blog post (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/blogs",
    request_body = CreateBlogPostInput,
    responses(
        (status = 201, description = "Blog post created", body = BlogPostResponse),
        (status = 409, description = "Slug already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_blog_post(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateBlogPostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .services
        .content
        .create_blog_post(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(BlogPostResponse::from(post)))
}

/// Update a blog post (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/blogs/{id}",
    params(("id" = Uuid, Path, description = "Blog post id")),
    request_body = UpdateBlogPostInput,
    responses(
        (status = 200, description = "Blog post updated", body = BlogPostResponse),
        (status = 404, description = "Blog post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_blog_post(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogPostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .services
        .content
        .update_blog_post(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BlogPostResponse::from(post)))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/banners", get(list_banners))
        .route("/blogs", get(list_blog_posts))
        .route("/blogs/:slug", get(get_blog_post))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/banners", post(create_banner))
        .route("/admin/banners/:id", delete(delete_banner))
        .route("/admin/blogs", post(create_blog_post))
        .route("/admin/blogs/:id", put(update_blog_post))
}
