// Stripe REST client
// Form-encoded requests authenticated with the secret key, bounded by a client timeout

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::types::{CheckoutSession, PaymentIntent, StripeErrorBody, StripeList};
use crate::app_config::StripeConfig;
use crate::services::payment_provider::{
    CheckoutSessionParams, CreatedCheckoutSession, PaymentProvider, ProviderError,
};

const PAGE_SIZE: &str = "100";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message.or(b.error.code))
            .unwrap_or_else(|| format!("HTTP {}", status));

        error!(
            "Stripe API request failed. Status: {}, Error: {}",
            status, message
        );

        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Walk a list endpoint with `starting_after` pagination
    async fn list_all<T, F>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        id_of: F,
    ) -> Result<Vec<T>, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> String,
    {
        collect_pages(
            path,
            |starting_after| {
                let mut params = query.clone();
                params.push(("limit".to_string(), PAGE_SIZE.to_string()));
                if let Some(cursor) = starting_after {
                    params.push(("starting_after".to_string(), cursor));
                }
                let request = self
                    .client
                    .get(self.endpoint(path))
                    .bearer_auth(&self.secret_key)
                    .query(&params);

                async move {
                    let response = request.send().await?;
                    Self::parse::<StripeList<T>>(response).await
                }
            },
            id_of,
        )
        .await
    }
}

/// `pi_` followed by alphanumerics; anything else must not reach a URL path
pub fn is_payment_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Follow `has_more` until the list is exhausted. The whole window is
/// walked in one call, since a later call restarts from the newest page.
async fn collect_pages<T, F, Fut, I>(
    path: &str,
    mut fetch_page: F,
    id_of: I,
) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<StripeList<T>, ProviderError>>,
    I: Fn(&T) -> String,
{
    let mut items = Vec::new();
    let mut starting_after: Option<String> = None;
    let mut page = 0usize;

    loop {
        let list = fetch_page(starting_after.clone()).await?;
        debug!("Fetched page {} of {} ({} items)", page, path, list.data.len());
        page += 1;

        let next_cursor = list.data.last().map(&id_of);
        let has_more = list.has_more;
        items.extend(list.data);

        match next_cursor {
            Some(cursor) if has_more => {
                if starting_after.as_deref() == Some(cursor.as_str()) {
                    return Err(ProviderError::InvalidResponse(format!(
                        "{} pagination did not advance past {}",
                        path, cursor
                    )));
                }
                starting_after = Some(cursor);
            },
            _ => return Ok(items),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, params), fields(user_id = %params.user_id, price = %params.price_id))]
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, ProviderError> {
        let response = self
            .client
            .post(self.endpoint("checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&params.to_form())
            .send()
            .await?;

        let session: CheckoutSession = Self::parse(response).await?;
        let url = session.url.ok_or_else(|| {
            ProviderError::InvalidResponse("checkout session has no redirect url".to_string())
        })?;

        Ok(CreatedCheckoutSession {
            id: session.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        if !is_payment_intent_id(payment_intent_id) {
            return Err(ProviderError::Api {
                status: 400,
                message: format!("Malformed payment intent id: {}", payment_intent_id),
            });
        }

        let response = self
            .client
            .get(self.endpoint(&format!("payment_intents/{}", payment_intent_id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse(response).await
    }

    #[instrument(skip(self))]
    async fn list_succeeded_payment_intents(
        &self,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<PaymentIntent>, ProviderError> {
        let query = vec![(
            "created[gte]".to_string(),
            created_after.timestamp().to_string(),
        )];

        let intents: Vec<PaymentIntent> = self
            .list_all("payment_intents", query, |pi: &PaymentIntent| pi.id.clone())
            .await?;

        Ok(intents.into_iter().filter(|pi| pi.is_succeeded()).collect())
    }

    #[instrument(skip(self, customer_email))]
    async fn list_paid_checkout_sessions(
        &self,
        customer_email: &str,
    ) -> Result<Vec<CheckoutSession>, ProviderError> {
        let query = vec![
            (
                "customer_details[email]".to_string(),
                customer_email.to_string(),
            ),
            ("status".to_string(), "complete".to_string()),
        ];

        let sessions: Vec<CheckoutSession> = self
            .list_all("checkout/sessions", query, |s: &CheckoutSession| s.id.clone())
            .await?;

        Ok(sessions.into_iter().filter(|s| s.is_paid()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted list of `total` ids served newest-first, 100 per page
    fn scripted_pages(
        total: usize,
        cursors: &Mutex<Vec<Option<String>>>,
    ) -> impl FnMut(Option<String>) -> std::future::Ready<Result<StripeList<String>, ProviderError>> + '_
    {
        let ids: Vec<String> = (0..total).rev().map(|n| format!("pi_{}", n)).collect();
        move |starting_after| {
            cursors.lock().unwrap().push(starting_after.clone());
            let start = match starting_after {
                Some(cursor) => ids.iter().position(|id| *id == cursor).map_or(ids.len(), |i| i + 1),
                None => 0,
            };
            let end = (start + 100).min(ids.len());
            std::future::ready(Ok(StripeList {
                data: ids[start..end].to_vec(),
                has_more: end < ids.len(),
            }))
        }
    }

    #[tokio::test]
    async fn test_collect_pages_walks_entire_window() {
        let cursors = Mutex::new(Vec::new());
        let items = collect_pages("payment_intents", scripted_pages(1500, &cursors), |id: &String| {
            id.clone()
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 1500);
        // Oldest intent is reached even past the fifteenth page
        assert_eq!(items.last().map(String::as_str), Some("pi_0"));

        let cursors = cursors.into_inner().unwrap();
        assert_eq!(cursors.len(), 15);
        assert_eq!(cursors[0], None);
        assert_eq!(cursors[1].as_deref(), Some("pi_1400"));
    }

    #[tokio::test]
    async fn test_collect_pages_single_page() {
        let cursors = Mutex::new(Vec::new());
        let items = collect_pages("payment_intents", scripted_pages(3, &cursors), |id: &String| {
            id.clone()
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["pi_2", "pi_1", "pi_0"]);
        assert_eq!(cursors.into_inner().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_pages_stuck_cursor_is_an_error() {
        let result = collect_pages(
            "payment_intents",
            |_| {
                std::future::ready(Ok(StripeList {
                    data: vec!["pi_same".to_string()],
                    has_more: true,
                }))
            },
            |id: &String| id.clone(),
        )
        .await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_payment_intent_id_shape() {
        assert!(is_payment_intent_id("pi_3NkZb2LkdIwHu7ix0q1"));
        assert!(!is_payment_intent_id("pi_"));
        assert!(!is_payment_intent_id("cs_123"));
        assert!(!is_payment_intent_id("pi_123/../customers"));
        assert!(!is_payment_intent_id("pi_12?expand=x"));
    }
}
