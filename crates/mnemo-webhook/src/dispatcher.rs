//! Drives the job queue: resolves a job's connector, preflights the host
//! permission, signs and POSTs the payload, and records the outcome.

use chrono::{DateTime, Utc};
use mnemo_types::connector::{Connector, ConnectorDocument};
use mnemo_types::job::{Job, JobStatus, MAX_ATTEMPTS, MAX_JOBS_PER_PUMP, RESPONSE_TRUNCATE_BYTES};

use crate::error::Result;
use crate::permission::PermissionOracle;
use crate::signing::{signature_header_value, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::store::JobStore;

#[derive(Debug, Default, Clone)]
pub struct PumpReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
}

/// Extracts `<scheme>://<host>[:port]/*` from a connector URL, the shape the
/// permission oracle checks against.
fn origin_pattern(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    Some(format!("{}://{}/*", parsed.scheme(), parsed.host_str()?.to_string() + &port_suffix(&parsed)))
}

fn port_suffix(url: &reqwest::Url) -> String {
    match url.port() {
        Some(p) => format!(":{}", p),
        None => String::new(),
    }
}

fn resolve_connector<'a>(connectors: &'a ConnectorDocument, job: &Job) -> Option<&'a Connector> {
    connectors.get(&job.connector_id).filter(|c| c.enabled && !c.url.is_empty())
}

async fn deliver(
    client: &reqwest::Client,
    connector: &Connector,
    job: &Job,
    now: DateTime<Utc>,
) -> std::result::Result<(u16, String), String> {
    let body = if job.payload.is_string() {
        job.payload.as_str().unwrap_or_default().to_string()
    } else {
        job.payload.to_string()
    };

    let mut req = client
        .post(&connector.url)
        .header("Content-Type", "application/json");

    for (k, v) in &connector.headers {
        req = req.header(k, v);
    }
    for (k, v) in &job.headers {
        req = req.header(k, v);
    }

    if let Some(secret) = &connector.secret {
        let ts = now.timestamp_millis();
        req = req
            .header(TIMESTAMP_HEADER, ts.to_string())
            .header(SIGNATURE_HEADER, signature_header_value(secret, ts, &body));
    }

    let response = req.body(body).send().await.map_err(|e| e.to_string())?;
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let truncated: String = text.chars().take(RESPONSE_TRUNCATE_BYTES).collect();
    Ok((status, truncated))
}

/// Scans at most `MAX_JOBS_PER_PUMP` runnable jobs oldest-first, resolving
/// each connector, preflighting its host permission, and delivering it.
pub async fn pump(
    store: &JobStore<'_>,
    connectors: &ConnectorDocument,
    oracle: &dyn PermissionOracle,
    client: &reqwest::Client,
    now: DateTime<Utc>,
) -> Result<PumpReport> {
    let mut report = PumpReport::default();
    let ids = store.oldest_first_ids()?;

    for id in ids {
        if report.attempted >= MAX_JOBS_PER_PUMP {
            break;
        }
        let Some(mut job) = store.get(&id)? else { continue };
        if !job.is_runnable(now) {
            continue;
        }
        report.attempted += 1;

        let Some(connector) = resolve_connector(connectors, &job) else {
            job.status = JobStatus::Failed;
            job.error = "missing_connector".to_string();
            job.updated_at = now;
            store.save(&job)?;
            report.failed += 1;
            continue;
        };

        let Some(origin) = origin_pattern(&connector.url) else {
            job.status = JobStatus::Failed;
            job.error = "missing_connector".to_string();
            job.updated_at = now;
            store.save(&job)?;
            report.failed += 1;
            continue;
        };

        if !oracle.is_allowed(&origin) {
            job.status = JobStatus::Failed;
            job.error = "missing_host_permission".to_string();
            job.updated_at = now;
            store.save(&job)?;
            report.failed += 1;
            continue;
        }

        job.status = JobStatus::Running;
        job.attempts += 1;
        job.updated_at = now;
        store.save(&job)?;

        match deliver(client, connector, &job, now).await {
            Ok((status, body)) if (200..300).contains(&status) => {
                job.status = JobStatus::Done;
                job.error.clear();
                job.last_response = Some(body);
                job.updated_at = now;
                store.save(&job)?;
                tracing::debug!(job_id = %job.id, "webhook delivered");
                report.succeeded += 1;
            }
            Ok((status, body)) => {
                job.last_response = Some(body);
                job.error = format!("http_{}", status);
                apply_backoff_or_fail(&mut job, now);
                store.save(&job)?;
                if job.status == JobStatus::Failed {
                    tracing::warn!(job_id = %job.id, status, "webhook exhausted retries");
                    report.failed += 1;
                } else {
                    report.retried += 1;
                }
            }
            Err(message) => {
                job.error = message;
                apply_backoff_or_fail(&mut job, now);
                store.save(&job)?;
                if job.status == JobStatus::Failed {
                    report.failed += 1;
                } else {
                    report.retried += 1;
                }
            }
        }
    }

    Ok(report)
}

fn apply_backoff_or_fail(job: &mut Job, now: DateTime<Utc>) {
    job.updated_at = now;
    if job.attempts >= MAX_ATTEMPTS {
        job.status = JobStatus::Failed;
    } else {
        job.status = JobStatus::Queued;
        let backoff = Job::backoff_ms(job.attempts);
        job.next_run_at = Some(now + chrono::Duration::milliseconds(backoff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_pattern_strips_path() {
        assert_eq!(
            origin_pattern("https://hooks.example.com/in/abc").unwrap(),
            "https://hooks.example.com/*"
        );
    }

    #[test]
    fn origin_pattern_keeps_explicit_port() {
        assert_eq!(
            origin_pattern("http://localhost:8080/webhook").unwrap(),
            "http://localhost:8080/*"
        );
    }

    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use mnemo_index::InMemoryKvStore;
    use crate::permission::AllowAll;

    /// Spawns a one-shot HTTP server on localhost that replies with
    /// `status_line` to the first request it receives, then exits.
    fn spawn_one_shot(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(
                    format!("{}\r\ncontent-length: 2\r\n\r\nok", status_line).as_bytes(),
                );
            }
        });
        format!("http://{}/hook", addr)
    }

    fn connector(id: &str, url: String) -> Connector {
        Connector {
            id: id.to_string(),
            name: id.to_string(),
            url,
            secret: None,
            headers: HashMap::new(),
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn successful_delivery_marks_job_done() {
        let now = Utc::now();
        let url = spawn_one_shot("HTTP/1.1 200 OK");
        let mut connectors = ConnectorDocument::default();
        connectors.by_id.insert("c1".to_string(), connector("c1", url));
        connectors.order.push("c1".to_string());

        let kv = InMemoryKvStore::new();
        let store = JobStore::new(&kv);
        store
            .enqueue("c1".to_string(), serde_json::json!({"hello": "world"}), HashMap::new(), None, now)
            .unwrap();

        let client = reqwest::Client::new();
        let report = pump(&store, &connectors, &AllowAll, &client, now).await.unwrap();

        assert_eq!(report.succeeded, 1);
        let jobs = store.list().unwrap();
        assert_eq!(jobs[0].status, JobStatus::Done);
        assert_eq!(jobs[0].attempts, 1);
    }

    #[tokio::test]
    async fn missing_connector_fails_immediately() {
        let now = Utc::now();
        let connectors = ConnectorDocument::default();
        let kv = InMemoryKvStore::new();
        let store = JobStore::new(&kv);
        store
            .enqueue("ghost".to_string(), serde_json::json!({}), HashMap::new(), None, now)
            .unwrap();

        let client = reqwest::Client::new();
        let report = pump(&store, &connectors, &AllowAll, &client, now).await.unwrap();

        assert_eq!(report.failed, 1);
        let jobs = store.list().unwrap();
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert_eq!(jobs[0].error, "missing_connector");
    }

    #[tokio::test]
    async fn denied_host_permission_fails_job() {
        let now = Utc::now();
        let mut connectors = ConnectorDocument::default();
        connectors
            .by_id
            .insert("c1".to_string(), connector("c1", "https://blocked.example/hook".to_string()));
        connectors.order.push("c1".to_string());

        let kv = InMemoryKvStore::new();
        let store = JobStore::new(&kv);
        store
            .enqueue("c1".to_string(), serde_json::json!({}), HashMap::new(), None, now)
            .unwrap();

        let client = reqwest::Client::new();
        let oracle = crate::permission::AllowListOracle::empty();
        let report = pump(&store, &connectors, &oracle, &client, now).await.unwrap();

        assert_eq!(report.failed, 1);
        let jobs = store.list().unwrap();
        assert_eq!(jobs[0].error, "missing_host_permission");
    }
}
