//! Request shapes for card-company and category reference data.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardCompanyRequest {
    #[validate(length(min = 1, message = "Company name must not be empty"))]
    pub company_name: String,
    /// One of the supported issuer codes (e.g. HYUNDAI, SHINHAN).
    pub company_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCardCompanyRequest {
    #[validate(length(min = 1, message = "Company name must not be empty"))]
    pub company_name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name must not be empty"))]
    pub category_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "Category name must not be empty"))]
    pub category_name: Option<String>,
    pub is_active: Option<bool>,
}
