//! Common test utilities - TrackerTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use trackerd::{Config, Server};

/// Test harness that spawns a real trackerd server on a random port
pub struct TrackerTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl TrackerTest {
    /// Start a new test server instance on an in-memory database
    pub async fn start() -> Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = Config {
            bind_addr: addr,
            ..Config::default()
        };

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            bail!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// POST a raw body labelled as JSON
    pub async fn post_raw(&self, path: &str, body: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// POST and require a given status, returning the JSON body
    pub async fn post_expect(&self, path: &str, body: &Value, status: StatusCode) -> Result<Value> {
        let resp = self.post(path, body).await?;
        let actual = resp.status();
        let body: Value = resp.json().await?;
        if actual != status {
            bail!("POST {} returned {} (expected {}): {}", path, actual, status, body);
        }
        Ok(body)
    }

    /// GET and require 200, returning the JSON body
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self.get(path).await?;
        let status = resp.status();
        let body: Value = resp.json().await?;
        if status != StatusCode::OK {
            bail!("GET {} returned {}: {}", path, status, body);
        }
        Ok(body)
    }

    /// Get direct access to the database for test setup/assertions
    pub fn db(&self) -> Arc<trackerd::db::Database> {
        self.server.db()
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }

    /// Create a campaign and return its ID
    pub async fn create_campaign(&self, title: &str) -> Result<String> {
        let body = self
            .post_expect("/campaigns", &json!({ "title": title }), StatusCode::CREATED)
            .await?;
        id_of(&body)
    }

    /// Create a player character and return its ID
    pub async fn create_player(&self, campaign_id: &str, name: &str) -> Result<String> {
        let body = self
            .post_expect(
                "/players",
                &json!({
                    "campaign_id": campaign_id,
                    "character_name": name,
                    "player_name": "Tester",
                    "character_class": "Fighter",
                    "race": "Human",
                    "armor_class": 16,
                }),
                StatusCode::CREATED,
            )
            .await?;
        id_of(&body)
    }

    /// Create a monster and return its ID
    pub async fn create_monster(&self, name: &str, hit_points: &str) -> Result<String> {
        let body = self
            .post_expect(
                "/monsters",
                &json!({
                    "name": name,
                    "armor_class": 13,
                    "hit_points": hit_points,
                }),
                StatusCode::CREATED,
            )
            .await?;
        id_of(&body)
    }

    /// Create an encounter and return its ID
    pub async fn create_encounter(
        &self,
        campaign_id: &str,
        name: &str,
        player_ids: &[String],
        monster_ids: &[String],
    ) -> Result<String> {
        let body = self
            .post_expect(
                "/encounters",
                &json!({
                    "campaign_id": campaign_id,
                    "name": name,
                    "player_ids": player_ids,
                    "monster_ids": monster_ids,
                }),
                StatusCode::CREATED,
            )
            .await?;
        id_of(&body)
    }
}

fn id_of(body: &Value) -> Result<String> {
    match body["id"].as_str() {
        Some(id) => Ok(id.to_string()),
        None => bail!("response has no id: {}", body),
    }
}

impl Drop for TrackerTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
