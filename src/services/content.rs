//! Storefront content: banners and blog posts.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::banner::{self, Entity as Banner};
use crate::entities::blog_post::{self, Entity as BlogPost};
use crate::errors::ServiceError;
use crate::services::catalog::slugify;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBannerInput {
    #[validate(length(min = 1, max = 255, message = "Banner title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "image_url is required"))]
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBlogPostInput {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub slug: Option<String>,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBlogPostInput {
    pub title: Option<String>,
    pub body: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_published: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone)]
pub struct ContentService {
    db: DatabaseConnection,
}

impl ContentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_banner(
        &self,
        input: CreateBannerInput,
    ) -> Result<banner::Model, ServiceError> {
        input.validate()?;

        let model = banner::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            image_url: Set(input.image_url),
            link_url: Set(input.link_url),
            position: Set(input.position),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(banner_id = %model.id, "Banner created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete_banner(&self, id: Uuid) -> Result<(), ServiceError> {
        let deleted = Banner::delete_by_id(id).exec(&self.db).await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Banner not found".to_string()));
        }
        Ok(())
    }

    /// Banners in display order; inactive ones only for admins.
    pub async fn list_banners(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<banner::Model>, ServiceError> {
        let mut query = Banner::find().order_by_asc(banner::Column::Position);
        if !include_inactive {
            query = query.filter(banner::Column::IsActive.eq(true));
        }
        let banners = query.all(&self.db).await?;
        Ok(banners)
    }

    #[instrument(skip(self, input))]
    pub async fn create_blog_post(
        &self,
        input: CreateBlogPostInput,
    ) -> Result<blog_post::Model, ServiceError> {
        input.validate()?;

        let slug = input
            .slug
            .as_deref()
            .map(slugify)
            .unwrap_or_else(|| slugify(&input.title));

        let duplicate = BlogPost::find()
            .filter(blog_post::Column::Slug.eq(slug.clone()))
            .one(&self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Blog slug {} already exists",
                slug
            )));
        }

        let model = blog_post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            slug: Set(slug),
            body: Set(input.body),
            cover_image_url: Set(input.cover_image_url),
            is_published: Set(input.is_published),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(post_id = %model.id, "Blog post created");
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_blog_post(
        &self,
        id: Uuid,
        input: UpdateBlogPostInput,
    ) -> Result<blog_post::Model, ServiceError> {
        let existing = BlogPost::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Blog post not found".to_string()))?;

        let mut active: blog_post::ActiveModel = existing.into();
        if let Some(v) = input.title {
            active.title = Set(v);
        }
        if let Some(v) = input.body {
            active.body = Set(v);
        }
        if let Some(v) = input.cover_image_url {
            active.cover_image_url = Set(Some(v));
        }
        if let Some(v) = input.is_published {
            active.is_published = Set(v);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Published posts for the storefront; drafts included only for admins.
    pub async fn list_blog_posts(
        &self,
        include_drafts: bool,
    ) -> Result<Vec<blog_post::Model>, ServiceError> {
        let mut query = BlogPost::find().order_by_desc(blog_post::Column::CreatedAt);
        if !include_drafts {
            query = query.filter(blog_post::Column::IsPublished.eq(true));
        }
        let posts = query.all(&self.db).await?;
        Ok(posts)
    }

    pub async fn get_blog_post_by_slug(
        &self,
        slug: &str,
        include_drafts: bool,
    ) -> Result<blog_post::Model, ServiceError> {
        let mut query = BlogPost::find().filter(blog_post::Column::Slug.eq(slugify(slug)));
        if !include_drafts {
            query = query.filter(blog_post::Column::IsPublished.eq(true));
        }
        query
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Blog post not found".to_string()))
    }
}
