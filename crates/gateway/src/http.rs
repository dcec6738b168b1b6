use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use exam_core::model::{
    AttemptAnswer, AttemptId, AttemptResult, ExamId, SectionId, TestCode,
};

use crate::api::{ExamGateway, SectionOutcome, SectionStart, StartedAttempt, TestCompletion};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::wire::{
    AnswerBody, CompleteSectionRequest, CompleteSectionResponse, CompleteTestRequest,
    CompleteTestResponse, ErrorBody, ResultResponse, SectionStartResponse, StartAttemptResponse,
    StartByCodeRequest,
};

/// `ExamGateway` over the backend's REST API.
///
/// Paths are relative to the configured base URL (the deployment's
/// `/api/student/` prefix) and keep the backend's trailing-slash convention.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpGateway {
    /// Build a gateway from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` for an unparseable base URL and
    /// `GatewayError::Network` if the HTTP client cannot be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut base = config.base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| GatewayError::Validation(format!("invalid base url {base:?}: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
        })
    }

    /// Build a gateway from the environment, if configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let config = GatewayConfig::from_env()?;
        Self::new(config).ok()
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Validation(format!("invalid endpoint {path:?}: {e}")))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Self::reject_error_status(response).await
    }

    async fn reject_error_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let fallback = status.canonical_reason().unwrap_or("request failed");
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message(fallback),
            Err(_) => fallback.to_owned(),
        };
        warn!("backend answered {status}: {message}");

        Err(match status {
            StatusCode::NOT_FOUND => GatewayError::NotFound,
            StatusCode::CONFLICT => GatewayError::Conflict(message),
            StatusCode::BAD_REQUEST => GatewayError::Validation(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Forbidden(message),
            s if s.is_server_error() => GatewayError::Server(s),
            s => GatewayError::Status(s),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ExamGateway for HttpGateway {
    async fn start_attempt(&self, exam_id: ExamId) -> Result<StartedAttempt, GatewayError> {
        let url = self.endpoint(&format!("tests/{exam_id}/start/"))?;
        let response = self.send(self.client.post(url)).await?;
        let payload: StartAttemptResponse = Self::decode(response).await?;
        let started = payload
            .into_domain()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        debug!(
            "started attempt {} on test {exam_id}",
            started.attempt.id()
        );
        Ok(started)
    }

    async fn start_attempt_by_code(
        &self,
        code: &TestCode,
    ) -> Result<StartedAttempt, GatewayError> {
        let url = self.endpoint("tests/start-attempt/")?;
        let body = StartByCodeRequest {
            test_code: code.as_str().to_owned(),
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let payload: StartAttemptResponse = Self::decode(response).await?;
        payload
            .into_domain()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn start_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
    ) -> Result<SectionStart, GatewayError> {
        let url = self.endpoint(&format!("tests/{exam_id}/sections/{section_id}/start/"))?;
        let response = self.send(self.client.post(url)).await?;
        let payload: SectionStartResponse = Self::decode(response).await?;
        let start = payload
            .into_domain()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        debug!(
            "section {section_id} started at {} with {}s budget",
            start.started_at, start.time_limit_secs
        );
        Ok(start)
    }

    async fn save_answer(
        &self,
        exam_id: ExamId,
        answer: &AttemptAnswer,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("tests/{exam_id}/answers/"))?;
        let body = AnswerBody::from_answer(answer);
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn complete_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
        answers: &[AttemptAnswer],
    ) -> Result<SectionOutcome, GatewayError> {
        let url = self.endpoint(&format!(
            "tests/{exam_id}/sections/{section_id}/complete/"
        ))?;
        let body = CompleteSectionRequest {
            answers: AnswerBody::from_answers(answers),
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let payload: CompleteSectionResponse = Self::decode(response).await?;
        Ok(payload.into_domain())
    }

    async fn complete_test(
        &self,
        exam_id: ExamId,
        attempt_id: AttemptId,
        answers: &[AttemptAnswer],
        time_taken_secs: u32,
    ) -> Result<TestCompletion, GatewayError> {
        let url = self.endpoint(&format!("tests/{exam_id}/complete/"))?;
        let body = CompleteTestRequest {
            attempt_id: attempt_id.value(),
            answers: AnswerBody::from_answers(answers),
            time_taken: time_taken_secs,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let payload: CompleteTestResponse = Self::decode(response).await?;
        let completion = payload.into_domain();
        debug!(
            "attempt {attempt_id} finalized: {}/{}",
            completion.score, completion.total_marks
        );
        Ok(completion)
    }

    async fn fetch_result(&self, exam_id: ExamId) -> Result<AttemptResult, GatewayError> {
        let url = self.endpoint(&format!("tests/{exam_id}/results/"))?;
        let response = self.send(self.client.get(url)).await?;
        let payload: ResultResponse = Self::decode(response).await?;
        payload
            .into_domain()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
