use anyhow::{anyhow, Result};
use log::info;
use std::env;

#[derive(Clone)]
pub struct StorageService {
    base_url: String,
    bucket: String,
    service_key: String,
}

impl StorageService {
    pub fn new() -> Result<Self> {
        let base_url = env::var("STORAGE_URL")
            .or_else(|_| env::var("SUPABASE_URL"))
            .map_err(|_| anyhow!("STORAGE_URL environment variable not set"))?;
        let service_key = env::var("STORAGE_SERVICE_KEY")
            .or_else(|_| env::var("SUPABASE_SERVICE_ROLE_KEY"))
            .map_err(|_| anyhow!("STORAGE_SERVICE_KEY environment variable not set"))?;
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "fusionx-tickets".to_string());

        Ok(Self {
            base_url,
            bucket,
            service_key,
        })
    }

    pub async fn upload_tickets(&self, file_path: &str, content: Vec<u8>) -> Result<String> {
        let full_path = format!("{}/{}", self.bucket, file_path);

        let client = reqwest::Client::new();
        let upload_url = format!("{}/storage/v1/object/{}", self.base_url, full_path);

        let response = client
            .post(&upload_url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("apikey", &self.service_key)
            .header("Content-Type", "text/html")
            .header("x-upsert", "true")
            .body(content)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Failed to upload to storage: {}", error_text));
        }

        let public_url = format!("{}/storage/v1/object/public/{}", self.base_url, full_path);
        info!("📄 Ticket file uploaded to storage: {}", public_url);

        Ok(public_url)
    }
}
