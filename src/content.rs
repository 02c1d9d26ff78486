// =============================================================================
// CONTENT MODULE
// =============================================================================
// Marketing copy for the back-office: SEO product descriptions, page copy
// and schema.org structured data.
//
// Generated text comes from an OpenAI-compatible chat completion API when
// one is configured. Every failure path (no key, timeout, HTTP error,
// unparsable answer) falls back to deterministic templates, so callers
// always get well-formed content and never an error.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::config::{AiConfig, SiteConfig};
use crate::metrics;
use crate::models::{Product, ProductWithCollection, StockStatus};

/// Generated copy is cached for a day, keyed by product revision
const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Ai,
    Template,
}

impl ContentSource {
    fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Ai => "ai",
            ContentSource::Template => "template",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoContent {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub source: ContentSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCopy {
    pub heading: String,
    pub body: String,
    pub source: ContentSource,
}

/// Shape the model is asked to answer with for product copy
#[derive(Debug, Deserialize)]
struct SeoAnswer {
    title: String,
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PageAnswer {
    heading: String,
    body: String,
}

// -----------------------------------------------------------------------------
// GENERATOR
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct ContentGenerator {
    http: reqwest::Client,
    ai: Option<AiConfig>,
    site: SiteConfig,
    cache: Option<redis::aio::ConnectionManager>,
}

impl ContentGenerator {
    pub fn new(
        ai: Option<AiConfig>,
        site: SiteConfig,
        cache: Option<redis::aio::ConnectionManager>,
    ) -> Result<Self> {
        let timeout = ai
            .as_ref()
            .map(|a| a.timeout)
            .unwrap_or(std::time::Duration::from_secs(15));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for content generation")?;
        Ok(Self {
            http,
            ai,
            site,
            cache,
        })
    }

    /// SEO title, description and keywords for a product.
    pub async fn product_description(&self, product: &Product) -> SeoContent {
        let cache_key = format!(
            "content:product:{}:{}",
            product.id,
            product.updated_at.timestamp()
        );
        if let Some(cached) = self.cache_get::<SeoContent>(&cache_key).await {
            return cached;
        }

        let prompt = format!(
            "Write SEO copy for a handmade textile product sold by {shop}.\n\
             Name: {name}\nColor: {color}\nPrice: {price}\nPieces: {pieces}\nDetails: {details}\n\
             Answer with JSON: {{\"title\": string (max 60 chars), \
             \"description\": string (max 160 chars), \"keywords\": [string]}}",
            shop = self.site.name,
            name = product.name,
            color = product.color,
            price = product.price,
            pieces = product.pieces.as_deref().unwrap_or("-"),
            details = product.description.as_deref().unwrap_or("-"),
        );

        match self.complete::<SeoAnswer>(&prompt).await {
            Some(answer) if !answer.title.trim().is_empty() => {
                let content = SeoContent {
                    title: answer.title.trim().to_string(),
                    description: answer.description.trim().to_string(),
                    keywords: answer.keywords,
                    source: ContentSource::Ai,
                };
                self.cache_put(&cache_key, &content).await;
                metrics::record_content_generation(content.source.as_str());
                content
            }
            _ => {
                metrics::record_content_generation(ContentSource::Template.as_str());
                product_template(product, &self.site.name)
            }
        }
    }

    /// Heading and body copy for a storefront page such as "about".
    pub async fn page_copy(&self, page: &str, brief: Option<&str>) -> PageCopy {
        let prompt = format!(
            "Write the '{page}' page for {shop}, a small business selling handmade textiles.\n\
             Direction from the owner: {brief}\n\
             Answer with JSON: {{\"heading\": string, \"body\": string (2-3 short paragraphs)}}",
            shop = self.site.name,
            brief = brief.unwrap_or("none"),
        );

        match self.complete::<PageAnswer>(&prompt).await {
            Some(answer) if !answer.heading.trim().is_empty() => {
                metrics::record_content_generation(ContentSource::Ai.as_str());
                PageCopy {
                    heading: answer.heading.trim().to_string(),
                    body: answer.body.trim().to_string(),
                    source: ContentSource::Ai,
                }
            }
            _ => {
                metrics::record_content_generation(ContentSource::Template.as_str());
                page_template(page, &self.site.name)
            }
        }
    }

    /// schema.org `Product` JSON-LD for a product page.
    pub fn product_structured_data(&self, product: &ProductWithCollection) -> serde_json::Value {
        structured_data(product, &self.site)
    }

    // -------------------------------------------------------------------------
    // PROVIDER CALL
    // -------------------------------------------------------------------------

    /// Returns `None` on any failure; the reason is logged.
    async fn complete<T: DeserializeOwned>(&self, prompt: &str) -> Option<T> {
        let ai = self.ai.as_ref()?;
        match self.request_completion(ai, prompt).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!(error = %e, "Content generation failed, using template");
                None
            }
        }
    }

    async fn request_completion<T: DeserializeOwned>(&self, ai: &AiConfig, prompt: &str) -> Result<T> {
        let body = json!({
            "model": ai.model,
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": "You are a copywriter for an artisan textile shop. Reply with JSON only." },
                { "role": "user", "content": prompt }
            ]
        });

        let response: serde_json::Value = self
            .http
            .post(format!("{}/chat/completions", ai.api_url))
            .bearer_auth(&ai.api_key)
            .json(&body)
            .send()
            .await
            .context("provider request failed")?
            .error_for_status()
            .context("provider returned an error status")?
            .json()
            .await
            .context("provider response is not JSON")?;

        let text = response
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("provider response has no message content"))?;

        serde_json::from_str(strip_code_fence(text)).context("model answer is not the expected JSON")
    }

    // -------------------------------------------------------------------------
    // CACHE (best effort)
    // -------------------------------------------------------------------------

    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.cache.clone()?;
        let cached = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| tracing::debug!(error = %e, "Content cache read failed"))
            .ok()
            .flatten();
        cached.and_then(|json| serde_json::from_str(&json).ok())
    }

    async fn cache_put<T: Serialize>(&self, key: &str, value: &T) {
        let Some(mut conn) = self.cache.clone() else {
            return;
        };
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let result: redis::RedisResult<()> = redis::cmd("SETEX")
            .arg(key)
            .arg(CACHE_TTL_SECS)
            .arg(json)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "Content cache write failed");
        }
    }
}

/// Models sometimes wrap JSON in ```json fences despite instructions
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

// -----------------------------------------------------------------------------
// TEMPLATES
// -----------------------------------------------------------------------------

pub fn product_template(product: &Product, shop: &str) -> SeoContent {
    let title = format!("{} in {} | {shop}", product.name, product.color);
    let mut description = format!(
        "Handmade {} in {}{}. Crafted by hand and delivered with cash on delivery.",
        product.name.to_lowercase(),
        product.color.to_lowercase(),
        product
            .pieces
            .as_deref()
            .map(|p| format!(", {p}"))
            .unwrap_or_default(),
    );
    truncate_chars(&mut description, 160);

    let mut keywords = vec![
        product.name.to_lowercase(),
        product.color.to_lowercase(),
        "handmade".to_string(),
        "textile".to_string(),
    ];
    keywords.dedup();

    SeoContent {
        title,
        description,
        keywords,
        source: ContentSource::Template,
    }
}

pub fn page_template(page: &str, shop: &str) -> PageCopy {
    let (heading, body) = match page.trim().to_lowercase().as_str() {
        "home" => (
            format!("Welcome to {shop}"),
            "Handmade textiles woven and stitched in small batches. \
             Browse our collections and order with cash on delivery."
                .to_string(),
        ),
        "about" => (
            format!("About {shop}"),
            "Every piece we sell is made by hand, using techniques passed down \
             through generations. We keep collections small so each item gets \
             the attention it deserves."
                .to_string(),
        ),
        "delivery" | "shipping" => (
            "Delivery & payment".to_string(),
            "We deliver to your door and you pay in cash on delivery. \
             We call every customer to confirm the order before it ships."
                .to_string(),
        ),
        "contact" => (
            "Contact us".to_string(),
            "Questions about an order or a custom piece? Reach out and we will \
             get back to you quickly."
                .to_string(),
        ),
        other => (
            capitalize(other),
            format!("Discover handmade textiles from {shop}."),
        ),
    };
    PageCopy {
        heading,
        body,
        source: ContentSource::Template,
    }
}

pub fn structured_data(item: &ProductWithCollection, site: &SiteConfig) -> serde_json::Value {
    let product = &item.product;
    let url = format!("{}/products/{}", site.url, product.slug);
    let availability = match product.stock_status {
        StockStatus::InStock => "https://schema.org/InStock",
        StockStatus::OutOfStock => "https://schema.org/OutOfStock",
    };

    let mut data = json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": product.name,
        "sku": product.slug,
        "color": product.color,
        "url": url,
        "image": product.images,
        "brand": { "@type": "Brand", "name": site.name },
        "offers": {
            "@type": "Offer",
            "url": url,
            "price": product.price,
            "availability": availability,
            "itemCondition": "https://schema.org/NewCondition",
            "acceptedPaymentMethod": "http://purl.org/goodrelations/v1#COD"
        }
    });
    if let Some(description) = &product.description {
        data["description"] = json!(description);
    }
    if let Some(collection) = &item.collection {
        data["category"] = json!(collection.name);
    }
    data
}

fn truncate_chars(text: &mut String, max: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
