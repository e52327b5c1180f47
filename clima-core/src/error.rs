use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{model::ErrorBody, provider::Stage};

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{stage} is unavailable")]
    Unavailable {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} returned a malformed payload: {detail}")]
    Protocol { stage: Stage, detail: String },
}

impl UpstreamError {
    pub fn stage(&self) -> Stage {
        match self {
            UpstreamError::Unavailable { stage, .. } | UpstreamError::Protocol { stage, .. } => {
                *stage
            }
        }
    }
}

/// Client-facing outcome of a failed `/clima` request. Each variant maps to
/// exactly one status code and one fixed message.
#[derive(Debug, Error)]
pub enum ClimaError {
    #[error("invalid zipcode")]
    InvalidInput,

    #[error("can not find zipcode")]
    NotFound,

    #[error("failed to query the zipcode service")]
    ResolverFailure(#[source] UpstreamError),

    #[error("failed to query the weather service")]
    WeatherFailure(#[source] UpstreamError),
}

impl ClimaError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClimaError::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            ClimaError::NotFound => StatusCode::NOT_FOUND,
            ClimaError::ResolverFailure(_) | ClimaError::WeatherFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ClimaError {
    fn into_response(self) -> Response {
        message_response(self.status(), self.to_string())
    }
}

/// Failure of the front service while relaying to the back service.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request")]
    InvalidRequest,

    #[error("invalid zipcode")]
    InvalidInput,

    #[error("failed to query the climate service")]
    Unavailable(#[source] reqwest::Error),

    #[error("failed to read the climate service response")]
    UnreadableResponse(#[source] reqwest::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest => StatusCode::BAD_REQUEST,
            RelayError::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::Unavailable(_) | RelayError::UnreadableResponse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ClimaError> for RelayError {
    fn from(err: ClimaError) -> Self {
        match err {
            ClimaError::InvalidInput => RelayError::InvalidInput,
            // Only validation runs on the front service.
            _ => RelayError::InvalidRequest,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        message_response(self.status(), self.to_string())
    }
}

fn message_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { message })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(stage: Stage) -> UpstreamError {
        UpstreamError::Protocol {
            stage,
            detail: "expected value at line 1 column 1".to_string(),
        }
    }

    #[test]
    fn clima_errors_map_to_fixed_status_and_message() {
        let cases = [
            (ClimaError::InvalidInput, 422, "invalid zipcode"),
            (ClimaError::NotFound, 404, "can not find zipcode"),
            (
                ClimaError::ResolverFailure(protocol(Stage::LocalityResolver)),
                500,
                "failed to query the zipcode service",
            ),
            (
                ClimaError::WeatherFailure(protocol(Stage::WeatherService)),
                500,
                "failed to query the weather service",
            ),
        ];

        for (err, status, message) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn upstream_error_keeps_stage_and_detail() {
        let err = protocol(Stage::WeatherService);
        assert_eq!(err.stage(), Stage::WeatherService);

        let msg = err.to_string();
        assert!(msg.contains("weather-service"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn relay_errors_map_to_fixed_status() {
        assert_eq!(RelayError::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::from(ClimaError::InvalidInput).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(RelayError::InvalidRequest.to_string(), "invalid request");
    }
}
