//! PocketBase store implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{debug, warn};

use rollcall_core::config::PocketBaseConfig;
use rollcall_core::error::{ErrorCode, RollcallError, RollcallResult};
use rollcall_core::traits::{ArrivalStore, DetectionStore, IdentityStore};
use rollcall_core::types::{normalize_address, DetectionRecord, Identity, NewArrival};

use crate::filter::Filter;

const IDENTITIES: &str = "employees";
const ARRIVALS: &str = "attendance";
const DETECTIONS: &str = "employee_detections";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Store backed by a PocketBase instance's REST API.
pub struct PocketBaseStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EmployeeRecord {
    id: String,
    name: String,
    mac_address: String,
    #[serde(default, deserialize_with = "chat_id")]
    telegram_chat_id: String,
    #[serde(default)]
    work_start_time: String,
    #[serde(default)]
    is_active: bool,
}

impl From<EmployeeRecord> for Identity {
    fn from(record: EmployeeRecord) -> Self {
        Identity {
            id: record.id,
            name: record.name,
            hardware_address: normalize_address(&record.mac_address),
            recipient: record.telegram_chat_id,
            expected_start: record.work_start_time,
            active: record.is_active,
        }
    }
}

/// Chat ids are stored as numbers; zero means "none".
fn chat_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) if n.as_i64() == Some(0) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        _ => String::new(),
    })
}

impl PocketBaseStore {
    /// Create a store from configuration.
    pub fn new(config: &PocketBaseConfig) -> RollcallResult<Self> {
        let parsed = url::Url::parse(&config.url).map_err(|e| {
            RollcallError::Configuration(format!("Invalid PocketBase URL '{}': {}", config.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RollcallError::Configuration(format!(
                "PocketBase URL must be http or https, got '{}'",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RollcallError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    /// First record of a collection matching the filter.
    async fn first_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> RollcallResult<Option<T>> {
        let filter = filter.to_string();
        debug!(collection, filter = %filter, "PocketBase lookup");

        let request = self
            .client
            .get(self.records_url(collection))
            .query(&[("filter", filter.as_str()), ("perPage", "1")]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(collection, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RollcallError::store_status(
                status.as_u16(),
                format!("Lookup in '{}' failed: {}", collection, body),
            ));
        }

        let list: RecordList<T> = response.json().await.map_err(|e| RollcallError::Parse {
            message: format!("Invalid '{}' list response: {}", collection, e),
            code: ErrorCode::ParseInvalidJson,
        })?;

        Ok(list.items.into_iter().next())
    }

    /// Create a record and return its id.
    async fn create_record(&self, collection: &str, body: &Value) -> RollcallResult<CreateResult> {
        let request = self.client.post(self.records_url(collection)).json(body);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(collection, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && is_not_unique(&text) {
                return Ok(CreateResult::NotUnique);
            }
            warn!(collection, status = status.as_u16(), body = %text, "PocketBase create rejected");
            return Err(RollcallError::store_status(
                status.as_u16(),
                format!("Create in '{}' failed: {}", collection, text),
            ));
        }

        let created: CreatedRecord = response.json().await.map_err(|e| RollcallError::Parse {
            message: format!("Invalid '{}' create response: {}", collection, e),
            code: ErrorCode::ParseInvalidJson,
        })?;

        Ok(CreateResult::Created(created.id))
    }
}

enum CreateResult {
    Created(String),
    NotUnique,
}

fn transport_error(collection: &str, e: reqwest::Error) -> RollcallError {
    let message = format!("PocketBase request to '{}' failed: {}", collection, e);
    let code = if e.is_timeout() {
        ErrorCode::NetTimeout
    } else {
        ErrorCode::NetConnectionFailed
    };
    RollcallError::Network {
        message,
        code,
        source: Some(Box::new(e)),
    }
}

/// Whether a PocketBase 400 body reports a unique-index violation on any field.
fn is_not_unique(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    value
        .get("data")
        .and_then(Value::as_object)
        .map_or(false, |fields| {
            fields
                .values()
                .any(|field| field.get("code").and_then(Value::as_str) == Some("validation_not_unique"))
        })
}

fn arrival_body(arrival: &NewArrival) -> Value {
    json!({
        "employee_id": arrival.identity_id,
        "check_in_time": arrival.arrived_at.to_rfc3339(),
        "scanner_mac": arrival.scanner_id,
        "status": arrival.timeliness.as_str(),
        "created_date": arrival.day.format(DAY_FORMAT).to_string(),
    })
}

fn detection_body(record: &DetectionRecord) -> Value {
    json!({
        "employee_id": record.identity_id,
        "mac_address": normalize_address(&record.hardware_address),
        "scanner_mac": record.scanner_id,
        "rssi": record.rssi,
        "device_type": record.device_type,
        "is_itag03": record.is_known_tag,
        "is_target_device": record.resolved,
        "device_name": record.resolved_name,
        "detected_at": record.detected_at.to_rfc3339(),
    })
}

#[async_trait]
impl IdentityStore for PocketBaseStore {
    async fn find_by_hardware_address(&self, address: &str) -> RollcallResult<Option<Identity>> {
        let filter = Filter::new()
            .eq("mac_address", &normalize_address(address))
            .eq_bool("is_active", true);

        let record: Option<EmployeeRecord> = self.first_record(IDENTITIES, &filter).await?;
        Ok(record.map(Identity::from))
    }
}

#[async_trait]
impl ArrivalStore for PocketBaseStore {
    async fn has_arrived_on(&self, identity_id: &str, day: NaiveDate) -> RollcallResult<bool> {
        let filter = Filter::new()
            .eq("employee_id", identity_id)
            .eq("created_date", &day.format(DAY_FORMAT).to_string());

        let record: Option<Value> = self.first_record(ARRIVALS, &filter).await?;
        Ok(record.is_some())
    }

    async fn create_arrival(&self, arrival: &NewArrival) -> RollcallResult<String> {
        match self.create_record(ARRIVALS, &arrival_body(arrival)).await? {
            CreateResult::Created(id) => Ok(id),
            CreateResult::NotUnique => Err(RollcallError::duplicate_arrival(
                arrival.identity_id.clone(),
                arrival.day,
            )),
        }
    }
}

#[async_trait]
impl DetectionStore for PocketBaseStore {
    async fn create_detection(&self, record: &DetectionRecord) -> RollcallResult<String> {
        match self.create_record(DETECTIONS, &detection_body(record)).await? {
            CreateResult::Created(id) => Ok(id),
            CreateResult::NotUnique => Err(RollcallError::store(
                "Detection rejected by a uniqueness rule",
            )),
        }
    }
}
