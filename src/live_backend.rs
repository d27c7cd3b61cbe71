use std::time::Duration;

use anyhow::{Result, bail};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{
    BackendError, COMPARISON_FAILED, PREDICTION_FAILED, PredictionBackend, check_result, check_winner,
    displayable_weight_classes,
};
use crate::http_client::http_client;
use crate::state::{
    Comparison, DatasetStats, HealthStatus, PredictionRequest, PredictionResult,
};

pub struct LiveBackend {
    client: &'static Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct FightersResponse {
    #[serde(default)]
    fighters: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WeightClassesResponse {
    #[serde(default)]
    weight_classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl LiveBackend {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(api_url)?;
        if base.cannot_be_a_base() {
            bail!("api url {api_url} cannot carry a path");
        }
        Ok(Self {
            client: http_client(timeout)?,
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, req: RequestBuilder) -> Result<(StatusCode, String), BackendError> {
        let req = req.build().map_err(transport)?;
        let method = req.method().clone();
        let url = req.url().clone();
        let resp = self.client.execute(req).map_err(transport)?;
        let status = resp.status();
        let body = resp.text().map_err(transport)?;
        debug!("{method} {url} -> {status}");
        Ok((status, body))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        fallback: &str,
    ) -> Result<T, BackendError> {
        let (status, body) = self.send(req)?;
        decode(status, &body, fallback)
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

fn decode<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    fallback: &str,
) -> Result<T, BackendError> {
    if !status.is_success() {
        return Err(BackendError::service(
            status.as_u16(),
            error_message(body),
            fallback,
        ));
    }
    serde_json::from_str(body.trim()).map_err(|err| BackendError::Parse(err.to_string()))
}

/// The `error` field of a failure payload, if the body carries one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body.trim())
        .ok()
        .and_then(|b| b.error)
}

pub fn parse_predict_response(
    status: StatusCode,
    body: &str,
) -> Result<PredictionResult, BackendError> {
    decode(status, body, PREDICTION_FAILED).and_then(check_result)
}

pub fn parse_compare_response(status: StatusCode, body: &str) -> Result<Comparison, BackendError> {
    decode(status, body, COMPARISON_FAILED)
}

pub fn parse_fighters_json(body: &str) -> Result<Vec<String>, BackendError> {
    if is_null(body) {
        return Ok(Vec::new());
    }
    let parsed: FightersResponse = decode(StatusCode::OK, body, "")?;
    Ok(parsed
        .fighters
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

pub fn parse_weight_classes_json(body: &str) -> Result<Vec<String>, BackendError> {
    if is_null(body) {
        return Ok(Vec::new());
    }
    let parsed: WeightClassesResponse = decode(StatusCode::OK, body, "")?;
    Ok(displayable_weight_classes(parsed.weight_classes))
}

fn is_null(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || trimmed == "null"
}

impl PredictionBackend for LiveBackend {
    fn health(&self) -> Result<HealthStatus, BackendError> {
        self.get_json(self.client.get(self.endpoint(&["api", "health"])), "health check failed")
    }

    fn dataset_stats(&self) -> Result<DatasetStats, BackendError> {
        self.get_json(self.client.get(self.endpoint(&["api", "stats"])), "stats unavailable")
    }

    fn weight_classes(&self) -> Result<Vec<String>, BackendError> {
        let (status, body) = self.send(self.client.get(self.endpoint(&["weight-classes"])))?;
        if !status.is_success() {
            return Err(BackendError::service(
                status.as_u16(),
                error_message(&body),
                "weight classes unavailable",
            ));
        }
        parse_weight_classes_json(&body)
    }

    fn fighters(&self, weight_class: Option<&str>) -> Result<Vec<String>, BackendError> {
        let mut req = self.client.get(self.endpoint(&["fighters"]));
        if let Some(class) = weight_class {
            req = req.query(&[("weight_class", class)]);
        }
        let (status, body) = self.send(req)?;
        if !status.is_success() {
            return Err(BackendError::service(
                status.as_u16(),
                error_message(&body),
                "fighters unavailable",
            ));
        }
        parse_fighters_json(&body)
    }

    fn fighter_weight_classes(&self, name: &str) -> Result<Vec<String>, BackendError> {
        let url = self.endpoint(&["fighter-weight-classes", name]);
        let parsed: WeightClassesResponse = self.get_json(self.client.get(url), "lookup failed")?;
        Ok(displayable_weight_classes(parsed.weight_classes))
    }

    fn compare(&self, fighter1: &str, fighter2: &str) -> Result<Comparison, BackendError> {
        let url = self.endpoint(&["api", "compare", fighter1, fighter2]);
        let (status, body) = self.send(self.client.get(url))?;
        parse_compare_response(status, &body)
    }

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, BackendError> {
        let req = self.client.post(self.endpoint(&["predict"])).json(request);
        let (status, body) = self.send(req)?;
        parse_predict_response(status, &body).and_then(|result| check_winner(request, result))
    }
}
