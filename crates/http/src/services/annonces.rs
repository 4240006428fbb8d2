//! Announcement moderation

use crate::client::request::PendingRequest;
use crate::client::{ApiClient, error::ClientError};
use crate::types::{Annonce, AnnonceQueue, ValidationHistory, ValidationRequest, ValidationStats};
use tracing::info;

const BASE: &str = "/admin/annonces";

#[derive(Clone, Debug)]
pub struct AnnonceService {
    client: ApiClient,
}

impl AnnonceService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, queue: AnnonceQueue) -> Result<Vec<Annonce>, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("{BASE}/{}", queue.path_segment())))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Annonce, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("{BASE}/{id}")))
            .await
    }

    pub async fn approve(&self, id: i64, decision: &ValidationRequest) -> Result<(), ClientError> {
        self.decide(id, "approve", decision).await
    }

    pub async fn reject(&self, id: i64, decision: &ValidationRequest) -> Result<(), ClientError> {
        self.decide(id, "reject", decision).await
    }

    pub async fn suspend(&self, id: i64, decision: &ValidationRequest) -> Result<(), ClientError> {
        self.decide(id, "suspend", decision).await
    }

    async fn decide(
        &self,
        id: i64,
        action: &str,
        decision: &ValidationRequest,
    ) -> Result<(), ClientError> {
        let req = PendingRequest::post(format!("{BASE}/{id}/{action}")).json(decision)?;
        self.client.complete(&req).await?;
        info!(annonce_id = id, action, validator = %decision.validator_id, "Announcement moderated");
        Ok(())
    }

    pub async fn activate(&self, id: i64) -> Result<Annonce, ClientError> {
        self.toggle(id, "activate").await
    }

    pub async fn deactivate(&self, id: i64) -> Result<Annonce, ClientError> {
        self.toggle(id, "deactivate").await
    }

    pub async fn feature(&self, id: i64) -> Result<Annonce, ClientError> {
        self.toggle(id, "feature").await
    }

    pub async fn unfeature(&self, id: i64) -> Result<Annonce, ClientError> {
        self.toggle(id, "unfeature").await
    }

    async fn toggle(&self, id: i64, action: &str) -> Result<Annonce, ClientError> {
        self.client
            .fetch(&PendingRequest::put(format!("{BASE}/{id}/{action}")))
            .await
    }

    pub async fn history(&self, id: i64) -> Result<Vec<ValidationHistory>, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("{BASE}/{id}/history")))
            .await
    }

    pub async fn stats(&self) -> Result<ValidationStats, ClientError> {
        self.client
            .fetch(&PendingRequest::get(format!("{BASE}/stats")))
            .await
    }
}
