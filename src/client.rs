use std::fmt;
use std::time::Duration;

use futures::{Stream, TryStreamExt, stream};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ComputeHordeError, Result};
use crate::job::ComputeHordeJob;
use crate::models::{FacilitatorJob, JobFeedback, JobSpec, JobsPage};

/// Async client for the Compute Horde Facilitator API.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone)]
pub struct ComputeHordeClient {
    client: Client,
    base_url: String,
    token: String,
    validator_hotkey: Option<String>,
    poll_interval: Duration,
}

impl fmt::Debug for ComputeHordeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeHordeClient")
            .field("base_url", &self.base_url)
            .field("validator_hotkey", &self.validator_hotkey)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl ComputeHordeClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.facilitator_url.trim_end_matches('/').to_string(),
            token: config.facilitator_token.clone(),
            validator_hotkey: config.validator_hotkey.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay between refreshes in [`ComputeHordeJob::wait`].
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%method, %url, "facilitator request");

        let request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, format!("Token {}", self.token));
        let response = build(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            error!(status = status.as_u16(), %url, "facilitator resource not found");
            return Err(ComputeHordeError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!(status = status.as_u16(), body = %message, "facilitator request failed");
            return Err(ComputeHordeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T> {
        let body = self.send(method, path, build).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Submit a new job to the Compute Horde.
    pub async fn create_job(&self, spec: &JobSpec) -> Result<ComputeHordeJob> {
        let request = spec.to_request(self.validator_hotkey.clone())?;
        debug!(docker_image = %spec.docker_image, executor_class = %spec.executor_class, "creating job");

        let response: FacilitatorJob = self
            .send_json(Method::POST, "job-docker/", |builder| builder.json(&request))
            .await?;
        debug!(uuid = %response.uuid, "created job");

        Ok(ComputeHordeJob::from_response(self.clone(), response))
    }

    /// Fetch a single job. A missing job yields [`ComputeHordeError::NotFound`].
    pub async fn get_job(&self, uuid: Uuid) -> Result<ComputeHordeJob> {
        debug!(%uuid, "fetching job");
        let response: FacilitatorJob = self
            .send_json(Method::GET, &format!("jobs/{uuid}/"), |builder| builder)
            .await
            .map_err(|e| match e {
                ComputeHordeError::NotFound(_) => ComputeHordeError::NotFound(format!("job {uuid}")),
                other => other,
            })?;
        Ok(ComputeHordeJob::from_response(self.clone(), response))
    }

    /// Fetch one page of the caller's jobs. Pages start at 1.
    pub async fn get_jobs(&self, page: u32, page_size: u32) -> Result<JobsPage<ComputeHordeJob>> {
        debug!(page, page_size, "fetching jobs");
        let response: JobsPage = self
            .send_json(Method::GET, "jobs/", |builder| {
                builder.query(&[("page", page), ("page_size", page_size)])
            })
            .await?;
        Ok(response.map(|job| ComputeHordeJob::from_response(self.clone(), job)))
    }

    /// Stream every job, following pagination until the last page.
    pub fn iter_jobs(&self, page_size: u32) -> impl Stream<Item = Result<ComputeHordeJob>> + use<> {
        let client = self.clone();
        stream::try_unfold(Some(1u32), move |page| {
            let client = client.clone();
            async move {
                let Some(page) = page else {
                    return Ok(None);
                };
                let page_jobs = client.get_jobs(page, page_size).await?;
                let next = page_jobs.has_next().then_some(page + 1);
                let jobs = stream::iter(page_jobs.results.into_iter().map(Ok::<_, ComputeHordeError>));
                Ok::<_, ComputeHordeError>(Some((jobs, next)))
            }
        })
        .try_flatten()
    }

    /// Report how correct a finished job's result was.
    pub async fn submit_feedback(&self, uuid: Uuid, feedback: &JobFeedback) -> Result<()> {
        debug!(%uuid, result_correctness = feedback.result_correctness, "submitting feedback");
        self.send(Method::PUT, &format!("jobs/{uuid}/feedback/"), |builder| {
            builder.json(feedback)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ExecutorClass, InputVolume, JobStatus};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const JOB_UUID: &str = "7b1f1e4c-3c57-4b8e-9f53-8d5f8d6e2a10";

    pub(crate) fn job_json(uuid: &str, status: &str, stdout: &str) -> Value {
        json!({
            "uuid": uuid,
            "executor_class": "spin_up-4min.gpu-24gb",
            "created_at": "2025-02-03T10:00:00Z",
            "status": status,
            "docker_image": "alpine:3",
            "args": "echo hi",
            "env": {},
            "use_gpu": true,
            "stdout": stdout,
        })
    }

    pub(crate) fn test_client(server: &MockServer) -> ComputeHordeClient {
        let config = ClientConfig::new("test-token")
            .with_facilitator_url(format!("{}/api/v1/", server.uri()))
            .with_poll_interval(Duration::from_millis(10));
        ComputeHordeClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn create_job_posts_payload_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/job-docker/"))
            .and(header("authorization", "Token test-token"))
            .and(body_json(json!({
                "target_validator_hotkey": null,
                "executor_class": "spin_up-4min.gpu-24gb",
                "docker_image": "alpine:3",
                "args": "echo hi",
                "env": {},
                "use_gpu": true,
                "volumes": [{
                    "volume_type": "single_file",
                    "url": "https://x/in.txt",
                    "relative_path": "in.txt",
                }],
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(job_json(JOB_UUID, "Sent", "")))
            .expect(1)
            .mount(&server)
            .await;

        let spec = JobSpec::new(ExecutorClass::SpinUp4MinGpu24Gb, "alpine:3")
            .args(["echo", "hi"])
            .input_volume("/volume/in.txt", InputVolume::http("https://x/in.txt"));
        let job = test_client(&server).create_job(&spec).await.unwrap();

        assert_eq!(job.uuid.to_string(), JOB_UUID);
        assert_eq!(job.status, JobStatus::Sent);
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn create_job_sends_validator_hotkey() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/job-docker/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(job_json(JOB_UUID, "Sent", "")))
            .mount(&server)
            .await;

        let config = ClientConfig::new("t")
            .with_facilitator_url(server.uri())
            .with_validator_hotkey("5Validator");
        let client = ComputeHordeClient::new(&config).unwrap();
        client
            .create_job(&JobSpec::new(ExecutorClass::default(), "img"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["target_validator_hotkey"], "5Validator");
    }

    #[tokio::test]
    async fn create_job_rejects_bad_mount_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let spec = JobSpec::new(ExecutorClass::default(), "img")
            .input_volume("/tmp/in.txt", InputVolume::http("https://x"));
        let err = test_client(&server).create_job(&spec).await.unwrap_err();
        assert!(matches!(err, ComputeHordeError::InvalidMountPath { .. }));
    }

    #[tokio::test]
    async fn get_job_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/jobs/{JOB_UUID}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(JOB_UUID, "Completed", "done\n")))
            .mount(&server)
            .await;

        let job = test_client(&server)
            .get_job(JOB_UUID.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap().stdout, "done\n");
    }

    #[tokio::test]
    async fn get_job_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"detail":"Not found."}"#))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_job(JOB_UUID.parse().unwrap())
            .await
            .unwrap_err();
        match err {
            ComputeHordeError::NotFound(what) => assert_eq!(what, format!("job {JOB_UUID}")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn not_found_is_logged_as_error() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_job(JOB_UUID.parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeHordeError::NotFound(_)));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("facilitator resource not found"));
        assert!(output.contains("status=404"));
        assert!(output.contains(&format!("jobs/{JOB_UUID}/")));
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_job(JOB_UUID.parse().unwrap())
            .await
            .unwrap_err();
        match err {
            ComputeHordeError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": "nope"})))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_job(JOB_UUID.parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeHordeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn get_jobs_sends_paging_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 6,
                "next": null,
                "previous": "http://f/api/v1/jobs/?page=1&page_size=5",
                "results": [job_json(JOB_UUID, "Failed", "")],
            })))
            .mount(&server)
            .await;

        let page = test_client(&server).get_jobs(2, 5).await.unwrap();
        assert_eq!(page.count, 6);
        assert!(!page.has_next());
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn get_jobs_keeps_unlisted_executor_class() {
        let server = MockServer::start().await;
        let mut unlisted = job_json("0d9c4a51-9c33-4bd4-8d2c-2f0a3c5b7e11", "Sent", "");
        unlisted["executor_class"] = json!("always_on.test");
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "next": null,
                "previous": null,
                "results": [job_json(JOB_UUID, "Completed", ""), unlisted],
            })))
            .mount(&server)
            .await;

        let page = test_client(&server).get_jobs(1, 10).await.unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(
            page.results[0].details().executor_class,
            ExecutorClass::SpinUp4MinGpu24Gb
        );
        assert_eq!(
            page.results[1].details().executor_class,
            ExecutorClass::Other("always_on.test".into())
        );
    }

    #[tokio::test]
    async fn iter_jobs_follows_next_links() {
        let server = MockServer::start().await;
        let second = "0d9c4a51-9c33-4bd4-8d2c-2f0a3c5b7e11";
        let third = "c5b0a7de-6f7d-4a5a-9b8e-1d2e3f405162";
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": "http://f/api/v1/jobs/?page=2&page_size=2",
                "previous": null,
                "results": [job_json(JOB_UUID, "Completed", ""), job_json(second, "Sent", "")],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": null,
                "previous": "http://f/api/v1/jobs/?page=1&page_size=2",
                "results": [job_json(third, "Accepted", "")],
            })))
            .mount(&server)
            .await;

        let jobs: Vec<ComputeHordeJob> = test_client(&server)
            .iter_jobs(2)
            .try_collect()
            .await
            .unwrap();
        let uuids: Vec<String> = jobs.iter().map(|job| job.uuid.to_string()).collect();
        assert_eq!(uuids, vec![JOB_UUID, second, third]);
    }

    #[tokio::test]
    async fn iter_jobs_stops_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result: Result<Vec<ComputeHordeJob>> =
            test_client(&server).iter_jobs(10).try_collect().await;
        assert!(matches!(result, Err(ComputeHordeError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn submit_feedback_puts_json() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/api/v1/jobs/{JOB_UUID}/feedback/")))
            .and(body_json(json!({"result_correctness": 0.9, "expected_duration": 12.5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let feedback = JobFeedback {
            result_correctness: 0.9,
            expected_duration: Some(12.5),
        };
        test_client(&server)
            .submit_feedback(JOB_UUID.parse().unwrap(), &feedback)
            .await
            .unwrap();
    }

    #[test]
    fn debug_hides_token() {
        let client = ComputeHordeClient::new(&ClientConfig::new("secret-token")).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert_eq!(client.base_url(), "https://facilitator.computehorde.io/api/v1");
    }
}
