//! HubSpot CRM API client.
//!
//! Uses a private app access token (Bearer auth) against the v3 objects API
//! and the v4 associations API.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CrmConfig;
use crate::metrics::{CRM_REQUESTS, CRM_REQUEST_DURATION};

use super::types::{AssociationsPage, PropertyUpdate};
use super::{Association, CrmClient, CrmError, CrmObject};

/// Upper bound on association pages followed for a single contact.
const MAX_ASSOCIATION_PAGES: usize = 50;

/// HubSpot API client.
pub struct HubSpotClient {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    properties: &'a PropertyUpdate,
}

impl HubSpotClient {
    /// Create a new HubSpot client.
    pub fn new(config: &CrmConfig) -> Result<Self, CrmError> {
        let access_token = config
            .token()
            .ok_or_else(|| CrmError::NotConfigured("Access token not configured".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn contact_url(&self, contact_id: &str) -> String {
        format!(
            "{}/crm/v3/objects/contacts/{}",
            self.base_url,
            urlencoding::encode(contact_id)
        )
    }

    fn associations_url(&self, contact_id: &str, object_type: &str) -> String {
        format!(
            "{}/crm/v4/objects/contacts/{}/associations/{}",
            self.base_url,
            urlencoding::encode(contact_id),
            urlencoding::encode(object_type)
        )
    }

    fn object_url(&self, object_type: &str, object_id: &str) -> String {
        format!(
            "{}/crm/v3/objects/{}/{}",
            self.base_url,
            urlencoding::encode(object_type),
            urlencoding::encode(object_id)
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.access_token)
    }

    async fn fetch_object(
        &self,
        url: &str,
        properties: &[&str],
        resource: String,
    ) -> Result<CrmObject, CrmError> {
        let response = self
            .get(url)
            .query(&[("properties", properties.join(","))])
            .send()
            .await?;
        let response = check_status(response, resource).await?;
        parse_json(response).await
    }
}

#[async_trait]
impl CrmClient for HubSpotClient {
    async fn get_contact(
        &self,
        contact_id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, CrmError> {
        debug!(contact_id, "Fetching contact");
        let url = self.contact_url(contact_id);
        observed(
            "get_contact",
            self.fetch_object(&url, properties, format!("Contact {}", contact_id)),
        )
        .await
    }

    async fn get_associations(
        &self,
        contact_id: &str,
        object_type: &str,
    ) -> Result<Vec<Association>, CrmError> {
        debug!(contact_id, object_type, "Fetching associations");
        let url = self.associations_url(contact_id, object_type);

        observed("get_associations", async {
            let mut associations = Vec::new();
            let mut after: Option<String> = None;

            for _ in 0..MAX_ASSOCIATION_PAGES {
                let mut request = self.get(&url);
                if let Some(cursor) = &after {
                    request = request.query(&[("after", cursor)]);
                }

                let response = request.send().await?;
                let response =
                    check_status(response, format!("Associations of contact {}", contact_id))
                        .await?;
                let page: AssociationsPage = parse_json(response).await?;

                after = page.next_cursor().map(str::to_string);
                associations.extend(page.results);

                if after.is_none() {
                    return Ok::<_, CrmError>(associations);
                }
            }

            warn!(
                contact_id,
                pages = MAX_ASSOCIATION_PAGES,
                "Association paging limit reached, using partial result"
            );
            Ok(associations)
        })
        .await
    }

    async fn get_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, CrmError> {
        debug!(object_type, object_id, "Fetching object");
        let url = self.object_url(object_type, object_id);
        observed(
            "get_object",
            self.fetch_object(&url, properties, format!("Object {} {}", object_type, object_id)),
        )
        .await
    }

    async fn update_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &PropertyUpdate,
    ) -> Result<(), CrmError> {
        debug!(object_type, object_id, fields = properties.len(), "Updating object");
        let url = self.object_url(object_type, object_id);

        observed("update_object", async {
            let response = self
                .client
                .patch(&url)
                .bearer_auth(&self.access_token)
                .json(&UpdateBody { properties })
                .send()
                .await?;
            check_status(response, format!("Object {} {}", object_type, object_id)).await?;
            Ok::<_, CrmError>(())
        })
        .await
    }
}

/// Run a CRM call while recording its duration and outcome.
async fn observed<T, F>(operation: &str, call: F) -> Result<T, CrmError>
where
    F: Future<Output = Result<T, CrmError>>,
{
    let start = Instant::now();
    let result = call.await;

    CRM_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    CRM_REQUESTS
        .with_label_values(&[operation, if result.is_ok() { "success" } else { "error" }])
        .inc();

    result
}

/// Map non-success responses to [`CrmError`].
async fn check_status(response: Response, resource: String) -> Result<Response, CrmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(CrmError::NotFound(resource)),
        StatusCode::TOO_MANY_REQUESTS => Err(CrmError::RateLimitExceeded),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(CrmError::Unauthorized(body))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(CrmError::ApiError {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, CrmError> {
    response
        .json()
        .await
        .map_err(|e| CrmError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> CrmConfig {
        CrmConfig {
            base_url: "https://api.example.com/".to_string(),
            access_token: token.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_token() {
        let result = HubSpotClient::new(&config_with_token(None));
        assert!(matches!(result, Err(CrmError::NotConfigured(_))));

        let result = HubSpotClient::new(&config_with_token(Some("")));
        assert!(matches!(result, Err(CrmError::NotConfigured(_))));
    }

    #[test]
    fn test_urls() {
        let client = HubSpotClient::new(&config_with_token(Some("pat-1"))).unwrap();

        assert_eq!(
            client.contact_url("101"),
            "https://api.example.com/crm/v3/objects/contacts/101"
        );
        assert_eq!(
            client.associations_url("101", "2-32975090"),
            "https://api.example.com/crm/v4/objects/contacts/101/associations/2-32975090"
        );
        assert_eq!(
            client.object_url("2-32975090", "77"),
            "https://api.example.com/crm/v3/objects/2-32975090/77"
        );
    }

    #[test]
    fn test_urls_encode_ids() {
        let client = HubSpotClient::new(&config_with_token(Some("pat-1"))).unwrap();
        assert_eq!(
            client.contact_url("a/b"),
            "https://api.example.com/crm/v3/objects/contacts/a%2Fb"
        );
    }

    #[test]
    fn test_update_body_shape() {
        let mut properties = PropertyUpdate::new();
        properties.insert("city".to_string(), "Oslo".to_string());

        let body = serde_json::to_value(UpdateBody {
            properties: &properties,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "properties": { "city": "Oslo" } }));
    }
}
