//! GA4 Data API `runReport` request/response shapes and the HTTP client behind
//! [`ReportBackend`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::credentials::{ServiceAccountCredentials, TokenError};
use crate::error::{ReportError, ReportResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DIMENSIONS: [&str; 2] = ["year", "month"];
pub const METRICS: [&str; 2] = ["totalUsers", "screenPageViews"];
pub const FILTER_FIELD: &str = "pagePath";
pub const FULL_REGEXP: &str = "FULL_REGEXP";

/// Parameters of one (property, regex) report call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub page_path_regex: String,
}

impl ReportRequest {
    pub fn property(&self) -> String {
        format!("properties/{}", self.property_id)
    }

    pub fn body(&self) -> RunReportBody {
        RunReportBody {
            date_ranges: vec![DateRange {
                start_date: self.start_date.format(DATE_FORMAT).to_string(),
                end_date: self.end_date.format(DATE_FORMAT).to_string(),
            }],
            dimensions: DIMENSIONS.iter().map(|name| Named::new(name)).collect(),
            metrics: METRICS.iter().map(|name| Named::new(name)).collect(),
            dimension_filter: FilterExpression {
                filter: Filter {
                    field_name: FILTER_FIELD.to_string(),
                    string_filter: StringFilter {
                        match_type: FULL_REGEXP.to_string(),
                        value: self.page_path_regex.clone(),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportBody {
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<Named>,
    pub metrics: Vec<Named>,
    pub dimension_filter: FilterExpression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Named {
    pub name: String,
}

impl Named {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: String,
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: String,
    pub value: String,
}

/// Raw values of one response row, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<String>,
}

impl ResponseRow {
    pub fn new<D, M>(dimension_values: D, metric_values: M) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            dimension_values: dimension_values.into_iter().map(Into::into).collect(),
            metric_values: metric_values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    value: String,
}

/// Parses a `runReport` response body. A missing `rows` key means no rows.
pub fn parse_response(body: &str) -> serde_json::Result<Vec<ResponseRow>> {
    let response: RunReportResponse = serde_json::from_str(body)?;
    Ok(response
        .rows
        .into_iter()
        .map(|row| ResponseRow {
            dimension_values: row.dimension_values.into_iter().map(|v| v.value).collect(),
            metric_values: row.metric_values.into_iter().map(|v| v.value).collect(),
        })
        .collect())
}

/// Anything that can answer a report request with rows.
#[cfg_attr(test, mockall::automock)]
pub trait ReportBackend {
    fn run_report(&self, request: &ReportRequest) -> ReportResult<Vec<ResponseRow>>;
}

/// Blocking GA4 Data API client authenticated with a service account.
#[derive(Debug)]
pub struct Ga4Client {
    http: reqwest::blocking::Client,
    credentials: ServiceAccountCredentials,
    api_base: Url,
}

impl Ga4Client {
    pub fn new(credentials: ServiceAccountCredentials, api_base: Url) -> ReportResult<Self> {
        let http = build_http_client()?;

        info!(action = "create", component = "ga4_client", api_base = %api_base, client_email = credentials.client_email(), "GA4 client created");
        Ok(Self {
            http,
            credentials,
            api_base,
        })
    }

    pub fn from_service_account(payload: &[u8], api_base: Url) -> ReportResult<Self> {
        let credentials = ServiceAccountCredentials::from_json(payload)?;
        Self::new(credentials, api_base)
    }

    pub fn endpoint(&self, property_id: &str) -> ReportResult<Url> {
        report_endpoint(&self.api_base, property_id)
    }
}

pub fn build_http_client() -> ReportResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ReportError::HttpClient(e.to_string()))
}

pub fn report_endpoint(api_base: &Url, property_id: &str) -> ReportResult<Url> {
    api_base
        .join(&format!("v1beta/properties/{property_id}:runReport"))
        .map_err(|e| ReportError::service_call(property_id, format!("invalid endpoint: {e}")))
}

impl ReportBackend for Ga4Client {
    fn run_report(&self, request: &ReportRequest) -> ReportResult<Vec<ResponseRow>> {
        let start_time = Instant::now();
        let property_id = request.property_id.as_str();

        let token = self.credentials.access_token(&self.http).map_err(|e| match e {
            TokenError::Sign(reason) => ReportError::Authentication(reason),
            other => ReportError::service_call(property_id, other.to_string()),
        })?;

        let endpoint = self.endpoint(property_id)?;
        debug!(action = "request", component = "ga4_client", endpoint = %endpoint, regex = %request.page_path_regex, "Sending runReport");

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(token)
            .json(&request.body())
            .send()
            .map_err(|e| ReportError::service_call(property_id, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ReportError::service_call(property_id, e.to_string()))?;
        if !status.is_success() {
            return Err(ReportError::service_call(property_id, format!("{status}: {body}")));
        }

        let rows = parse_response(&body).map_err(|e| {
            ReportError::service_call(property_id, format!("undecodable response: {e}"))
        })?;

        debug!(
            action = "response",
            component = "ga4_client",
            property_id,
            row_count = rows.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "runReport answered"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ReportRequest {
        ReportRequest {
            property_id: "424738282".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
            page_path_regex: ".*(/mp/).*".to_string(),
        }
    }

    #[test]
    fn body_matches_run_report_shape() {
        let body = serde_json::to_value(request().body()).unwrap();
        assert_eq!(
            body,
            json!({
                "dateRanges": [{"startDate": "2024-08-01", "endDate": "2024-08-31"}],
                "dimensions": [{"name": "year"}, {"name": "month"}],
                "metrics": [{"name": "totalUsers"}, {"name": "screenPageViews"}],
                "dimensionFilter": {
                    "filter": {
                        "fieldName": "pagePath",
                        "stringFilter": {"matchType": "FULL_REGEXP", "value": ".*(/mp/).*"}
                    }
                }
            })
        );
        assert_eq!(request().property(), "properties/424738282");
    }

    #[test]
    fn dates_are_zero_padded_iso() {
        let mut req = request();
        req.start_date = NaiveDate::from_ymd_opt(999, 1, 2).unwrap();
        req.end_date = NaiveDate::from_ymd_opt(2025, 12, 9).unwrap();
        let range = &req.body().date_ranges[0];
        assert_eq!(range.start_date, "0999-01-02");
        assert_eq!(range.end_date, "2025-12-09");
    }

    #[test]
    fn parses_rows_in_order() {
        let body = r#"{
            "dimensionHeaders": [{"name": "year"}, {"name": "month"}],
            "metricHeaders": [{"name": "totalUsers", "type": "TYPE_INTEGER"}],
            "rows": [
                {"dimensionValues": [{"value": "2024"}, {"value": "08"}],
                 "metricValues": [{"value": "150"}, {"value": "300"}]},
                {"dimensionValues": [{"value": "2024"}, {"value": "09"}],
                 "metricValues": [{"value": "7"}, {"value": "8"}]}
            ],
            "rowCount": 2,
            "kind": "analyticsData#runReport"
        }"#;

        let rows = parse_response(body).unwrap();
        assert_eq!(
            rows,
            vec![
                ResponseRow::new(["2024", "08"], ["150", "300"]),
                ResponseRow::new(["2024", "09"], ["7", "8"]),
            ]
        );
    }

    #[test]
    fn missing_rows_key_is_empty() {
        let rows = parse_response(r#"{"kind": "analyticsData#runReport"}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn http_client_builds_without_credentials() {
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn endpoint_joins_property_path() {
        let base = Url::parse("https://analyticsdata.googleapis.com/").unwrap();
        assert_eq!(
            report_endpoint(&base, "424738282").unwrap().as_str(),
            "https://analyticsdata.googleapis.com/v1beta/properties/424738282:runReport"
        );
    }
}
