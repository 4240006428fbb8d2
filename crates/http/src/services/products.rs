//! Product catalogue

use crate::client::request::PendingRequest;
use crate::client::{ApiClient, error::ClientError};
use crate::envelope::Page;
use crate::types::{Product, ProductCategory, ProductQuery};
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct ProductService {
    client: ApiClient,
}

impl ProductService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of products, searched when the query carries a search term
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, ClientError> {
        self.client.execute_page(&query.to_request()).await
    }

    pub async fn get(&self, id: &str) -> Result<Product, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("products/{id}")))
            .await
    }

    pub async fn create<T: Serialize + ?Sized>(&self, product: &T) -> Result<Product, ClientError> {
        let req = PendingRequest::post("products").json(product)?;
        self.client.fetch(&req).await
    }

    pub async fn update<T: Serialize + ?Sized>(
        &self,
        id: &str,
        product: &T,
    ) -> Result<Product, ClientError> {
        let req = PendingRequest::put(format!("products/{id}")).json(product)?;
        self.client.fetch(&req).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client
            .complete(&PendingRequest::delete(format!("products/{id}")))
            .await
    }

    pub async fn approve(&self, id: &str) -> Result<Product, ClientError> {
        self.client
            .fetch(&PendingRequest::post(format!("products/{id}/approve")))
            .await
    }

    pub async fn reject(&self, id: &str) -> Result<Product, ClientError> {
        self.client
            .fetch(&PendingRequest::post(format!("products/{id}/reject")))
            .await
    }

    pub async fn expiring_soon(&self) -> Result<Vec<Product>, ClientError> {
        Ok(self
            .client
            .execute_page(&PendingRequest::get("products/expiring-soon"))
            .await?
            .items)
    }

    pub async fn categories(&self) -> Result<Vec<ProductCategory>, ClientError> {
        Ok(self
            .client
            .execute_page(&PendingRequest::get("products/categories"))
            .await?
            .items)
    }
}
