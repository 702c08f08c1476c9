//! `reqwest` implementation of [`MarketplaceApi`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use skecho_core::{CartItemId, ProductId};
use tracing::instrument;

use super::{ApiError, MarketplaceApi};
use crate::config::ApiConfig;
use crate::identity::Credential;
use crate::models::{Cart, CompleteProfileRequest, SellerProfile, SellerProfileRequest, UserProfile};

/// Body of `POST /cart/items`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddCartItemBody<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

/// Body of `PUT /cart/items/:id`.
#[derive(Debug, Serialize)]
struct UpdateCartItemBody {
    quantity: u32,
}

/// HTTP client for the marketplace REST API.
///
/// Cheaply cloneable; every request carries the configured timeout.
#[derive(Clone)]
pub struct HttpMarketplaceApi {
    inner: Arc<HttpMarketplaceApiInner>,
}

struct HttpMarketplaceApiInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketplaceApi {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpMarketplaceApiInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn request(&self, method: Method, credential: &Credential, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, self.url(path))
            .bearer_auth(credential.token())
    }

    /// Send a request and map non-success statuses to [`ApiError`].
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(
            status = %status,
            path,
            body = %body.chars().take(200).collect::<String>(),
            "Marketplace API returned non-success status"
        );

        Err(classify_status(status, retry_after, body, path))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, credential, path), path)
            .await?;
        let text = response.text().await.map_err(map_transport_error)?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse marketplace API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn write<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        credential: &Credential,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut request = self.request(method, credential, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, path).await?;
        Ok(())
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Http(error)
    }
}

/// Map a non-success status to an error.
fn classify_status(
    status: StatusCode,
    retry_after: Option<u64>,
    body: String,
    path: &str,
) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(retry_after.unwrap_or(1)),
        _ => ApiError::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        },
    }
}

fn cart_item_path(item_id: &CartItemId) -> String {
    format!("/cart/items/{}", urlencoding::encode(item_id.as_str()))
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceApi {
    #[instrument(skip(self, credential))]
    async fn create_user(&self, credential: &Credential) -> Result<(), ApiError> {
        self.write::<()>(Method::POST, credential, "/auth/create-user", None)
            .await
    }

    #[instrument(skip(self, credential))]
    async fn user_profile(&self, credential: &Credential) -> Result<UserProfile, ApiError> {
        self.get_json(credential, "/user/profile").await
    }

    #[instrument(skip(self, credential, request))]
    async fn complete_user_profile(
        &self,
        credential: &Credential,
        request: &CompleteProfileRequest,
    ) -> Result<(), ApiError> {
        self.write(
            Method::POST,
            credential,
            "/user/complete-profile",
            Some(request),
        )
        .await
    }

    #[instrument(skip(self, credential))]
    async fn seller_profile(
        &self,
        credential: &Credential,
    ) -> Result<Option<SellerProfile>, ApiError> {
        match self.get_json(credential, "/seller/profile").await {
            Ok(profile) => Ok(Some(profile)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, credential, request))]
    async fn create_seller_profile(
        &self,
        credential: &Credential,
        request: &SellerProfileRequest,
    ) -> Result<(), ApiError> {
        self.write(Method::POST, credential, "/seller/profile", Some(request))
            .await
    }

    #[instrument(skip(self, credential))]
    async fn cart(&self, credential: &Credential) -> Result<Cart, ApiError> {
        self.get_json(credential, "/cart").await
    }

    #[instrument(skip(self, credential))]
    async fn add_cart_item(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = AddCartItemBody {
            product_id,
            quantity,
        };
        self.write(Method::POST, credential, "/cart/items", Some(&body))
            .await
    }

    #[instrument(skip(self, credential))]
    async fn update_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = UpdateCartItemBody { quantity };
        self.write(Method::PUT, credential, &cart_item_path(item_id), Some(&body))
            .await
    }

    #[instrument(skip(self, credential))]
    async fn remove_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
    ) -> Result<(), ApiError> {
        self.write::<()>(Method::DELETE, credential, &cart_item_path(item_id), None)
            .await
    }

    #[instrument(skip(self, credential))]
    async fn clear_cart(&self, credential: &Credential) -> Result<(), ApiError> {
        self.write::<()>(Method::DELETE, credential, "/cart", None)
            .await
    }
}
