//! Alidns API response bodies

use serde::Deserialize;

/// Error-shaped body, returned with a non-2xx status
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

/// `DescribeDomainRecords` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeDomainRecordsResponse {
    pub domain_records: DomainRecords,
    pub total_count: Option<u64>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainRecords {
    #[serde(default)]
    pub record: Vec<RecordItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordItem {
    pub record_id: String,
    pub value: String,
    #[serde(rename = "RR", default)]
    pub rr: String,
    #[serde(rename = "Type", default)]
    pub record_type: String,
}

/// `UpdateDomainRecord` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDomainRecordResponse {
    pub record_id: String,
    pub request_id: Option<String>,
}
