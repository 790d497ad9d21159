//! Product catalog: products, categories, and combo bundles.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::category::{self, Entity as Category};
use crate::entities::combo::{self, Entity as Combo};
use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;

/// Derives a URL slug from a display name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    /// Derived from `name` when omitted
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 120, message = "Category name is required"))]
    pub name: String,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateComboInput {
    #[validate(length(min = 1, max = 255, message = "Combo name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Combo must include at least one product"))]
    pub product_ids: Vec<Uuid>,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone)]
pub struct CatalogService {
    db: DatabaseConnection,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn price_check(price: Decimal) -> Result<(), ServiceError> {
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        Self::price_check(input.price)?;

        let slug = input
            .slug
            .as_deref()
            .map(slugify)
            .unwrap_or_else(|| slugify(&input.name));
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "slug cannot be empty".to_string(),
            ));
        }

        let duplicate = Product::find()
            .filter(product::Column::Slug.eq(slug.clone()))
            .one(&self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product slug {} already exists",
                slug
            )));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            price: Set(input.price),
            image_url: Set(input.image_url),
            category_id: Set(input.category_id),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(product_id = %model.id, "Product created");
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = Product::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(v) = input.name {
            active.name = Set(v);
        }
        if let Some(v) = input.description {
            active.description = Set(Some(v));
        }
        if let Some(v) = input.price {
            Self::price_check(v)?;
            active.price = Set(v);
        }
        if let Some(v) = input.image_url {
            active.image_url = Set(Some(v));
        }
        if let Some(v) = input.category_id {
            active.category_id = Set(Some(v));
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let deleted = Product::delete_by_id(id).exec(&self.db).await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Storefront listing hides inactive products; admins see everything.
    pub async fn list_products(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find().order_by_desc(product::Column::CreatedAt);
        if !include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        let products = query.all(&self.db).await?;
        Ok(products)
    }

    pub async fn get_product_by_slug(
        &self,
        slug: &str,
        include_inactive: bool,
    ) -> Result<product::Model, ServiceError> {
        let mut query = Product::find().filter(product::Column::Slug.eq(slugify(slug)));
        if !include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        query
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let slug = input
            .slug
            .as_deref()
            .map(slugify)
            .unwrap_or_else(|| slugify(&input.name));

        let duplicate = Category::find()
            .filter(category::Column::Slug.eq(slug.clone()))
            .one(&self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category slug {} already exists",
                slug
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(category_id = %model.id, "Category created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let in_use = Product::find()
            .filter(product::Column::CategoryId.eq(id))
            .one(&self.db)
            .await?;
        if in_use.is_some() {
            return Err(ServiceError::Conflict(
                "Category still has products".to_string(),
            ));
        }

        let deleted = Category::delete_by_id(id).exec(&self.db).await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_categories(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = Category::find().order_by_asc(category::Column::Name);
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }
        let categories = query.all(&self.db).await?;
        Ok(categories)
    }

    #[instrument(skip(self, input))]
    pub async fn create_combo(&self, input: CreateComboInput) -> Result<combo::Model, ServiceError> {
        input.validate()?;
        Self::price_check(input.price)?;

        // Every referenced product must exist
        let found = Product::find()
            .filter(product::Column::Id.is_in(input.product_ids.clone()))
            .all(&self.db)
            .await?;
        if found.len() != input.product_ids.len() {
            return Err(ServiceError::ValidationError(
                "combo references unknown products".to_string(),
            ));
        }

        let model = combo::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            product_ids: Set(serde_json::json!(input.product_ids)),
            price: Set(input.price),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(combo_id = %model.id, "Combo created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete_combo(&self, id: Uuid) -> Result<(), ServiceError> {
        let deleted = Combo::delete_by_id(id).exec(&self.db).await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Combo not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_combos(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<combo::Model>, ServiceError> {
        let mut query = Combo::find().order_by_desc(combo::Column::CreatedAt);
        if !include_inactive {
            query = query.filter(combo::Column::IsActive.eq(true));
        }
        let combos = query.all(&self.db).await?;
        Ok(combos)
    }
}
