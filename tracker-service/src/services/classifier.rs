//! Merchant-to-category classification through a text provider.
//!
//! The prompt constrains the answer to the supplied category names, but
//! the model's reply is returned verbatim (trimmed): membership
//! validation and the default-category fallback belong to the caller.

use std::sync::Arc;

use crate::services::providers::{ProviderError, TextProvider};

#[derive(Clone)]
pub struct Categorizer {
    provider: Arc<dyn TextProvider>,
}

impl Categorizer {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    /// Classify a single merchant label against the category names.
    pub async fn categorize_one(
        &self,
        merchant_name: &str,
        category_names: &[String],
    ) -> Result<String, ProviderError> {
        let prompt = single_prompt(merchant_name, category_names);
        let response = self.provider.generate(&prompt).await?;

        tracing::debug!(merchant = %merchant_name, response = %response, "Classifier response");
        Ok(response.trim().to_string())
    }

    /// Classify many merchant labels in one call. The reply is expected to
    /// carry one category name per line, in input order; blank lines are
    /// dropped. Callers must check the returned length against the input.
    pub async fn categorize_batch(
        &self,
        merchant_names: &[String],
        category_names: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let prompt = batch_prompt(merchant_names, category_names);
        let response = self.provider.generate(&prompt).await?;

        tracing::debug!(
            merchants = merchant_names.len(),
            response = %response,
            "Classifier batch response"
        );

        Ok(response
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

fn single_prompt(merchant_name: &str, category_names: &[String]) -> String {
    format!(
        "Pick the best matching spending category for this merchant.\n\n\
         Merchant: {}\n\
         Categories: {}\n\n\
         Answer with exactly one category name from the list and nothing else.",
        merchant_name,
        category_names.join(", ")
    )
}

fn batch_prompt(merchant_names: &[String], category_names: &[String]) -> String {
    let listing = merchant_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Pick the best matching spending category for each merchant below.\n\n\
         Merchants:\n{}\n\n\
         Categories: {}\n\n\
         Answer with one category name per line, in the same order, \
         with no numbering or extra text.",
        listing,
        category_names.join(", ")
    )
}
