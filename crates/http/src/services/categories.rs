//! Business categories

use crate::client::request::PendingRequest;
use crate::client::{ApiClient, error::ClientError};
use crate::types::{BusinessCategory, BusinessCategoryRequest};

const BASE: &str = "/admin/business-categories";

#[derive(Clone, Debug)]
pub struct BusinessCategoryService {
    client: ApiClient,
}

impl BusinessCategoryService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<BusinessCategory>, ClientError> {
        self.client.fetch(&PendingRequest::get(BASE)).await
    }

    pub async fn get(&self, id: &str) -> Result<BusinessCategory, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("{BASE}/{id}")))
            .await
    }

    pub async fn create(
        &self,
        category: &BusinessCategoryRequest,
    ) -> Result<BusinessCategory, ClientError> {
        let req = PendingRequest::post(BASE).json(category)?;
        self.client.fetch(&req).await
    }

    pub async fn update(
        &self,
        id: &str,
        category: &BusinessCategoryRequest,
    ) -> Result<BusinessCategory, ClientError> {
        let req = PendingRequest::put(format!("{BASE}/{id}")).json(category)?;
        self.client.fetch(&req).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client
            .complete(&PendingRequest::delete(format!("{BASE}/{id}")))
            .await
    }
}
