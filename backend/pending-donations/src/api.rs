//! Donation service client. Lists pending donations, updates volunteer
//! remarks and downloads donor profile images.
//!
//! Every call is a single request: nothing is retried and no idempotency key
//! is attached, so two identical updates issue two writes.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::donation::{AdminRemark, DonationRecord, Donor, VolunteerRemark};
use crate::errors::{DonationsError, Result};

/// Remote operations the screen depends on.
///
/// Implemented over HTTP by [`HttpDonationApi`]; the screen tests use an
/// in-memory fake.
pub trait DonationApi: Send + Sync + 'static {
    /// `GET {base}/volunteer/pending-donation`
    fn fetch_pending_donations(&self) -> impl Future<Output = Result<Vec<DonationRecord>>> + Send;

    /// `POST {base}/{id}/update-volunteer-remark/{status}`
    fn update_volunteer_remark(
        &self,
        id: &str,
        status: VolunteerRemark,
    ) -> impl Future<Output = Result<()>> + Send;
}

// ─────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingResponse {
    pub data: Vec<RawDonation>,
}

/// A donation exactly as the service serialises it.
#[derive(Debug, Deserialize, Clone)]
pub struct RawDonation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "DonationType", default)]
    pub donation_type: String,
    #[serde(rename = "Create", default)]
    pub create: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "donorFirstName", default)]
    pub donor_first_name: Option<String>,
    #[serde(rename = "donorlastName", default)]
    pub donor_last_name: Option<String>,
    #[serde(rename = "donorprofileImg", default)]
    pub donor_profile_img: Option<String>,
    #[serde(rename = "AdminRemark", default)]
    pub admin_remark: String,
    #[serde(rename = "VolunteerRemark")]
    pub volunteer_remark: String,
}

// ─────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpDonationApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDonationApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_client(client, &config.api_base_url, config.api_token.clone())
    }

    pub fn with_client(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DonationsError::Config(format!("Invalid API_BASE_URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DonationsError::Config(format!(
                "API_BASE_URL cannot be used as a base: {base_url}"
            )));
        }
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// URL of a donor's profile image. Used by the view for avatars.
    pub fn profile_image_url(&self, reference: &str) -> String {
        self.endpoint(&["upload-file", reference]).to_string()
    }

    /// Download a donor's profile image.
    pub async fn fetch_profile_image(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&["upload-file", reference]);
        debug!("GET {url}");
        let resp = check_status(self.authorize(self.client.get(url)).send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl DonationApi for HttpDonationApi {
    async fn fetch_pending_donations(&self) -> Result<Vec<DonationRecord>> {
        let url = self.endpoint(&["volunteer", "pending-donation"]);
        debug!("GET {url}");

        let resp = check_status(self.authorize(self.client.get(url)).send().await?).await?;
        let body: PendingResponse = serde_json::from_slice(&resp.bytes().await?)?;

        debug!("Fetched {} pending donations", body.data.len());
        decode_donations(body.data)
    }

    async fn update_volunteer_remark(&self, id: &str, status: VolunteerRemark) -> Result<()> {
        let url = self.endpoint(&[id, "update-volunteer-remark", status.as_str()]);
        debug!("POST {url}");

        check_status(self.authorize(self.client.post(url)).send().await?).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`DonationsError::Service`], preferring the
/// body's `message` field.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(text);

    Err(DonationsError::Service {
        status: status.as_u16(),
        message,
    })
}

// ─────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────

/// Decode raw service records, preserving order. A record with an unknown
/// volunteer remark fails the whole batch; a missing or unreadable creation
/// date only leaves `created_at` empty.
pub fn decode_donations(raw: Vec<RawDonation>) -> Result<Vec<DonationRecord>> {
    raw.into_iter().map(decode_single).collect()
}

fn decode_single(raw: RawDonation) -> Result<DonationRecord> {
    let volunteer_remark = VolunteerRemark::parse(&raw.volunteer_remark).ok_or_else(|| {
        DonationsError::Decode(format!(
            "donation {} has unknown volunteer remark {:?}",
            raw.id, raw.volunteer_remark
        ))
    })?;

    let created_at = raw.create.as_deref().and_then(parse_timestamp);
    if created_at.is_none() {
        debug!("Donation {} has no usable creation date: {:?}", raw.id, raw.create);
    }

    Ok(DonationRecord {
        id: raw.id,
        title: raw.title,
        donation_type: raw.donation_type,
        created_at,
        location: raw.location,
        donor: Donor {
            first_name: raw.donor_first_name.unwrap_or_default(),
            last_name: raw.donor_last_name.unwrap_or_default(),
            profile_image: raw.donor_profile_img.filter(|r| !r.is_empty()),
        },
        admin_remark: AdminRemark(raw.admin_remark),
        volunteer_remark,
    })
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates taken as UTC midnight.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, remark: &str) -> RawDonation {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "Title": "Winter coats",
            "DonationType": "Clothes",
            "Create": "2024-01-15T09:30:00.000Z",
            "Location": "Pune",
            "donorFirstName": "Asha",
            "donorlastName": "Patil",
            "donorprofileImg": "asha.png",
            "AdminRemark": "approved",
            "VolunteerRemark": remark,
        }))
        .unwrap()
    }

    #[test]
    fn decode_full_record() {
        let records = decode_donations(vec![raw("d1", "received")]).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.id, "d1");
        assert_eq!(rec.title, "Winter coats");
        assert_eq!(rec.donation_type, "Clothes");
        assert_eq!(
            rec.created_at.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-15T09:30:00+00:00")
        );
        assert_eq!(rec.donor.display_name(), "Asha Patil");
        assert_eq!(rec.donor.profile_image.as_deref(), Some("asha.png"));
        assert_eq!(rec.admin_remark.as_str(), "approved");
        assert_eq!(rec.volunteer_remark, VolunteerRemark::Received);
    }

    #[test]
    fn decode_keeps_order() {
        let records =
            decode_donations(vec![raw("b", "pending"), raw("a", "pending"), raw("c", "pending")])
                .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn unknown_remark_fails_batch() {
        let err = decode_donations(vec![raw("ok", "pending"), raw("bad", "lost")]).unwrap_err();
        assert!(matches!(err, DonationsError::Decode(ref m) if m.contains("bad")));
    }

    #[test]
    fn missing_donor_fields_default() {
        let raw: RawDonation = serde_json::from_value(serde_json::json!({
            "_id": "d2",
            "Create": "2024-02-01T00:00:00Z",
            "VolunteerRemark": "pending",
        }))
        .unwrap();
        let rec = decode_donations(vec![raw]).unwrap().remove(0);
        assert_eq!(rec.donor.first_name, "");
        assert_eq!(rec.donor.profile_image, None);
        assert_eq!(rec.title, "");
    }

    #[test]
    fn unreadable_date_keeps_record() {
        let mut bad = raw("d3", "pending");
        bad.create = Some("yesterday".to_string());
        let records = decode_donations(vec![raw("d1", "pending"), bad]).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["d1", "d3"]);
        assert!(records[0].created_at.is_some());
        assert_eq!(records[1].created_at, None);
    }

    #[test]
    fn missing_date_keeps_record() {
        let raw: RawDonation = serde_json::from_value(serde_json::json!({
            "_id": "d4",
            "Title": "Blankets",
            "VolunteerRemark": "received",
        }))
        .unwrap();
        let rec = decode_donations(vec![raw]).unwrap().remove(0);
        assert_eq!(rec.id, "d4");
        assert_eq!(rec.created_at, None);
        assert_eq!(rec.volunteer_remark, VolunteerRemark::Received);
    }

    #[test]
    fn date_only_value_is_utc_midnight() {
        let mut rec = raw("d5", "pending");
        rec.create = Some("2024-01-15".to_string());
        let decoded = decode_donations(vec![raw("d1", "pending"), rec]).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(
            decoded[1].created_at.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-15T00:00:00+00:00")
        );
    }

    #[test]
    fn endpoints_keep_base_path() {
        let api =
            HttpDonationApi::with_client(Client::new(), "http://localhost:8000/api/", None).unwrap();
        assert_eq!(
            api.endpoint(&["d1", "update-volunteer-remark", "delivered"]).as_str(),
            "http://localhost:8000/api/d1/update-volunteer-remark/delivered"
        );
        assert_eq!(
            api.profile_image_url("asha.png"),
            "http://localhost:8000/api/upload-file/asha.png"
        );
    }

    #[test]
    fn endpoint_escapes_segments() {
        let api = HttpDonationApi::with_client(Client::new(), "http://localhost", None).unwrap();
        assert_eq!(
            api.profile_image_url("my photo.png"),
            "http://localhost/upload-file/my%20photo.png"
        );
    }

    #[test]
    fn invalid_base_url_rejected() {
        assert!(matches!(
            HttpDonationApi::with_client(Client::new(), "not a url", None),
            Err(DonationsError::Config(_))
        ));
        assert!(matches!(
            HttpDonationApi::with_client(Client::new(), "mailto:someone@example.org", None),
            Err(DonationsError::Config(_))
        ));
    }
}
