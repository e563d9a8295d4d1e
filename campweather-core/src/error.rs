use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The AccuWeather call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LocationSearch,
    FiveDayForecast,
    ActiveAlerts,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::LocationSearch => "location search",
            Operation::FiveDayForecast => "5 day forecast",
            Operation::ActiveAlerts => "active alerts",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an upstream call failed, derived from the HTTP status (or its absence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamReason {
    /// The API key was rejected.
    Auth,
    /// The account's plan or quota does not cover the request.
    Plan,
    /// Transport failure or a 5xx from the provider.
    Unavailable,
    /// Any other non-success response.
    Generic,
}

impl UpstreamReason {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => UpstreamReason::Auth,
            402 | 403 | 429 => UpstreamReason::Plan,
            s if s >= 500 => UpstreamReason::Unavailable,
            _ => UpstreamReason::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamReason::Auth => "accuweather-auth",
            UpstreamReason::Plan => "accuweather-plan",
            UpstreamReason::Unavailable => "accuweather-unavailable",
            UpstreamReason::Generic => "accuweather-error",
        }
    }

    /// Status reported to our own callers for this reason.
    pub fn http_status(&self) -> StatusCode {
        match self {
            UpstreamReason::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for UpstreamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one AccuWeather HTTP call.
///
/// `upstream_status` and `upstream_body` are diagnostics for logs; they are
/// not meant to be shown to end users.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub reason: UpstreamReason,
    pub operation: Operation,
    pub message: String,
    pub upstream_status: Option<StatusCode>,
    pub upstream_body: Option<String>,
}

impl UpstreamError {
    /// No response at all: DNS, connect, TLS or body read failure.
    pub fn transport(operation: Operation) -> Self {
        let reason = UpstreamReason::Unavailable;
        Self {
            reason,
            operation,
            message: message_for(reason, operation, None),
            upstream_status: None,
            upstream_body: None,
        }
    }

    pub fn from_response(operation: Operation, status: StatusCode, body: String) -> Self {
        let reason = UpstreamReason::from_status(status);
        Self {
            reason,
            operation,
            message: message_for(reason, operation, Some(status)),
            upstream_status: Some(status),
            upstream_body: Some(body),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        self.reason.http_status()
    }
}

fn message_for(reason: UpstreamReason, operation: Operation, status: Option<StatusCode>) -> String {
    match reason {
        UpstreamReason::Auth => format!(
            "AccuWeather rejected the configured API key while requesting {operation}. \
             Check the ACCUWEATHER_API_KEY setting."
        ),
        UpstreamReason::Plan => {
            format!("AccuWeather denied the {operation} request for this account's plan or quota.")
        }
        UpstreamReason::Unavailable => {
            format!("AccuWeather was unavailable while requesting {operation}.")
        }
        UpstreamReason::Generic => match status {
            Some(status) => format!(
                "AccuWeather returned status {} for the {operation} request.",
                status.as_u16()
            ),
            None => format!("AccuWeather returned an unexpected response for the {operation} request."),
        },
    }
}

/// Everything [`crate::ForecastAggregator::weekend_forecast`] can fail with.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Rejected before any upstream call was made.
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A 2xx response that lacks the data we need, e.g. no location `Key`.
    #[error("AccuWeather {operation} returned a malformed response: {detail}")]
    MalformedResponse { operation: Operation, detail: String },
}

impl ForecastError {
    pub fn malformed(operation: Operation, detail: impl Into<String>) -> Self {
        ForecastError::MalformedResponse { operation, detail: detail.into() }
    }

    /// Upstream reason, if the error came from the provider at all.
    pub fn reason(&self) -> Option<UpstreamReason> {
        match self {
            ForecastError::InvalidCoordinates { .. } => None,
            ForecastError::Upstream(err) => Some(err.reason),
            ForecastError::MalformedResponse { .. } => Some(UpstreamReason::Generic),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ForecastError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
            ForecastError::Upstream(err) => err.http_status(),
            ForecastError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ForecastError::InvalidCoordinates { .. })
    }
}
