//! Merchant administration

use crate::client::request::PendingRequest;
use crate::client::{ApiClient, error::ClientError};
use crate::types::{Merchant, MerchantList, MerchantListParams, MerchantStats, SuspendRequest};
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct MerchantService {
    client: ApiClient,
}

impl MerchantService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &MerchantListParams) -> Result<MerchantList, ClientError> {
        let req = params.apply(PendingRequest::get("merchants"));
        self.client.fetch(&req).await
    }

    pub async fn get(&self, id: &str) -> Result<Merchant, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("merchants/{id}")))
            .await
    }

    pub async fn create<T: Serialize + ?Sized>(&self, merchant: &T) -> Result<Merchant, ClientError> {
        let req = PendingRequest::post("merchants").json(merchant)?;
        self.client.fetch(&req).await
    }

    pub async fn update<T: Serialize + ?Sized>(
        &self,
        id: &str,
        merchant: &T,
    ) -> Result<Merchant, ClientError> {
        let req = PendingRequest::put(format!("merchants/{id}")).json(merchant)?;
        self.client.fetch(&req).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client
            .complete(&PendingRequest::delete(format!("merchants/{id}")))
            .await
    }

    pub async fn verify(&self, id: &str) -> Result<Merchant, ClientError> {
        self.client
            .fetch(&PendingRequest::post(format!("merchants/{id}/verify")))
            .await
    }

    pub async fn suspend(&self, id: &str, reason: Option<String>) -> Result<Merchant, ClientError> {
        let req =
            PendingRequest::post(format!("merchants/{id}/suspend")).json(&SuspendRequest { reason })?;
        self.client.fetch(&req).await
    }

    pub async fn stats(&self) -> Result<MerchantStats, ClientError> {
        self.client.fetch(&PendingRequest::get("merchants/stats")).await
    }

    /// Merchants still waiting for verification
    pub async fn pending_verification(&self) -> Result<MerchantList, ClientError> {
        self.list(&MerchantListParams {
            verified: Some(false),
            ..MerchantListParams::default()
        })
        .await
    }
}
