use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{Job, JobExecution, JobInput, JobStatistics};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use serde_json::json;
use std::sync::Arc;

const BASE: &str = "/api/jobs";

#[derive(Debug, Clone)]
pub struct JobService {
    client: BaseClient,
}

impl JobService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.client.get(BASE, NO_PARAMS).await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let path = item_path(BASE, "job_id", job_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn create_job(&self, job: &JobInput) -> Result<Job> {
        self.client.post(BASE, job).await
    }

    pub async fn update_job(&self, job_id: &str, job: &JobInput) -> Result<Job> {
        let path = item_path(BASE, "job_id", job_id)?;
        self.client.put(&path, job).await
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        let path = item_path(BASE, "job_id", job_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    pub async fn execute_job(&self, job_id: &str) -> Result<JobExecution> {
        let path = format!("{}/execute", item_path(BASE, "job_id", job_id)?);
        tracing::info!("▶️ Executing job {}", job_id);
        self.client.post(&path, &json!({})).await
    }

    pub async fn get_job_history(&self, job_id: &str) -> Result<Vec<JobExecution>> {
        let path = format!("{}/history", item_path(BASE, "job_id", job_id)?);
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn get_statistics(&self) -> Result<JobStatistics> {
        self.client
            .get(&format!("{}/statistics", BASE), NO_PARAMS)
            .await
    }
}

impl ApiService for JobService {
    fn service_name(&self) -> &'static str {
        "jobs"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
