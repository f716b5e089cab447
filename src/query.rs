//! Client for the query-serving subsystem.
//!
//! The subsystem is treated as a black box behind a narrow contract:
//! `connect` yields a handle or a connection failure, `execute` runs one
//! query and reports the row count. Large result sets arrive as a
//! pull-based stream of row batches ([`QueryClient::batches`]) with
//! `next_cursor = null` as the end-of-stream signal, so callers drain
//! pages instead of looping on an exception-based exit.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, TryStreamExt, stream};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::sample::{OpOutput, Operation};

/// One page of rows pulled from the query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RowBatch {
    pub rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Connected handle to the query subsystem.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueryClient {
    /// Probe the endpoint's health route and return a handle.
    ///
    /// Any transport failure or non-200 status is a
    /// [`Error::Connection`]; the orchestrator skips the query battery on
    /// that outcome instead of aborting the run.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;
        let base_url = endpoint.trim_end_matches('/').to_string();

        let response = http
            .get(format!("{base_url}/health"))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Connection(format!(
                "health probe returned HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::info!(endpoint = %base_url, "connected to query subsystem");
        Ok(Self { http, base_url })
    }

    /// Lazy stream of row batches for one query.
    ///
    /// Each pull POSTs the current cursor; a page without a `next_cursor`
    /// ends the stream.
    pub fn batches(&self, sql: &str) -> impl Stream<Item = Result<RowBatch>> + Send + 'static {
        let http = self.http.clone();
        let url = format!("{}/query", self.base_url);
        let sql = sql.to_string();

        stream::try_unfold(Some(None::<String>), move |state| {
            let http = http.clone();
            let url = url.clone();
            let sql = sql.clone();
            async move {
                let Some(cursor) = state else {
                    return Ok(None);
                };
                let page: QueryPage = http
                    .post(&url)
                    .json(&json!({ "sql": sql, "cursor": cursor }))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                let next_state = page.next_cursor.map(Some);
                Ok(Some((RowBatch { rows: page.rows }, next_state)))
            }
        })
    }

    /// Run one query to completion, draining all batches.
    pub async fn execute(&self, sql: &str) -> Result<OpOutput> {
        let mut batches = pin!(self.batches(sql));
        let mut rows = 0u64;
        while let Some(batch) = batches.try_next().await? {
            rows += batch.rows.len() as u64;
        }
        Ok(OpOutput { rows })
    }

    /// Package one query as an [`Operation`] for the executors.
    pub fn operation(self: &Arc<Self>, sql: &str) -> Operation {
        let client = Arc::clone(self);
        let owned = sql.to_string();
        Operation::new(query_label(sql), move || {
            let client = client.clone();
            let sql = owned.clone();
            async move { client.execute(&sql).await }
        })
    }
}

fn query_label(sql: &str) -> String {
    let head: String = sql.chars().take(50).collect();
    format!("query: {head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let body_len = text
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: ").or_else(|| l.strip_prefix("Content-Length: ")))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    }

    /// Serves a health route plus a two-page query result.
    async fn spawn_stub_service() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let request = read_request(&mut socket).await;
                if request.starts_with("GET /health") {
                    respond(&mut socket, "200 OK", "{}").await;
                } else if request.contains("\"cursor\":null") {
                    respond(
                        &mut socket,
                        "200 OK",
                        r#"{"rows":[1,2,3],"next_cursor":"page-2"}"#,
                    )
                    .await;
                } else {
                    respond(&mut socket, "200 OK", r#"{"rows":[4,5],"next_cursor":null}"#).await;
                }
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn execute_drains_all_pages() {
        let endpoint = spawn_stub_service().await;
        let client = QueryClient::connect(&endpoint).await.unwrap();
        let out = client.execute("SELECT * FROM users").await.unwrap();
        assert_eq!(out.rows, 5);
    }

    #[tokio::test]
    async fn connect_fails_against_a_dead_endpoint() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = QueryClient::connect(&format!("http://{addr}")).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn operation_samples_carry_row_counts() {
        let endpoint = spawn_stub_service().await;
        let client = Arc::new(QueryClient::connect(&endpoint).await.unwrap());
        let op = client.operation("SELECT * FROM users LIMIT 10");

        let sample = op.run_timed().await;
        assert!(sample.success);
        assert_eq!(
            sample.metadata.get("row_count"),
            Some(&serde_json::Value::from(5u64))
        );
    }

    #[test]
    fn labels_truncate_long_queries() {
        let sql = "SELECT something_long FROM a_table WHERE a_condition_holds AND more";
        let label = query_label(sql);
        assert!(label.starts_with("query: SELECT"));
        assert!(label.ends_with("..."));
        assert!(label.len() <= "query: ".len() + 50 + 3);
    }
}
