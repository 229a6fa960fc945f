//! HTTP access to the vendor API.
//!
//! [`CollectionClient`] is the seam the list controller is generic over;
//! [`RestCollection`] is the production implementation and [`AuthClient`]
//! exchanges credentials for a [`Session`].

use std::{future::Future, marker::PhantomData};

use api_types::{
    ErrorBody,
    auth::{LoginRequest, LoginResponse},
};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    entity::{Entity, Resource},
    error::{ClientError, Result},
    session::{Session, SessionContext},
};

/// Extra query parameters sent with `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    query: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Read/write access to one REST collection.
pub trait CollectionClient<T>: Clone + Send + Sync + 'static {
    fn list(&self, params: &ListParams) -> impl Future<Output = Result<Vec<T>>> + Send;

    fn fetch(&self, id: &str) -> impl Future<Output = Result<T>> + Send;

    fn create(&self, payload: &Value) -> impl Future<Output = Result<T>> + Send;

    fn update(&self, id: &str, patch: &Value) -> impl Future<Output = Result<T>> + Send;

    fn remove(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|err| ClientError::Validation(format!("invalid base_url: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Validation(format!(
            "invalid base_url: {base_url}"
        )));
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Validation(format!("invalid base_url: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn send(req: RequestBuilder) -> Result<Response> {
    let res = req.send().await?;
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let message = res
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(ErrorBody::into_message);
    tracing::warn!(
        %status,
        message = message.as_deref().unwrap_or("-"),
        "request rejected"
    );
    Err(ClientError::server(status, message))
}

/// Reads a JSON body, treating an empty body as `None`.
async fn read_body(res: Response) -> Result<Option<Value>> {
    let bytes = res.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| ClientError::InvalidResponse(err.to_string()))
}

/// Accepts a bare array or an object holding the list under the resource's
/// list key or `data`.
pub(crate) fn decode_list<T: DeserializeOwned>(body: Value, resource: &Resource) -> Result<Vec<T>> {
    let list = match body {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => [resource.list_key, "data"]
            .into_iter()
            .find_map(|key| map.remove(key))
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("missing \"{}\" list", resource.list_key))
            })?,
        other => {
            return Err(ClientError::InvalidResponse(format!(
                "expected a list, got {other}"
            )));
        }
    };
    serde_json::from_value(list).map_err(|err| ClientError::InvalidResponse(err.to_string()))
}

/// Accepts a bare record or one wrapped under the resource's item key or
/// `data`.
pub(crate) fn decode_item<T: DeserializeOwned>(body: Value, resource: &Resource) -> Result<T> {
    if let Value::Object(map) = &body {
        for key in [resource.item_key, "data"] {
            if let Some(inner) = map.get(key).filter(|inner| inner.is_object()) {
                if let Ok(item) = T::deserialize(inner) {
                    return Ok(item);
                }
            }
        }
    }
    serde_json::from_value(body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
}

/// A REST collection scoped to the signed-in vendor.
///
/// Every request carries the session's bearer token and `vendorId`; without
/// a session the call fails with [`ClientError::SignedOut`] before anything
/// is sent.
pub struct RestCollection<T> {
    base_url: Url,
    http: reqwest::Client,
    session: SessionContext,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RestCollection<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            session: self.session.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> RestCollection<T> {
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http: reqwest::Client::new(),
            session,
            _marker: PhantomData,
        })
    }

    /// Shares one connection pool between collections.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn url(&self, id: Option<&str>) -> Result<Url> {
        match id {
            Some(id) => endpoint(&self.base_url, &[T::RESOURCE.path, id]),
            None => endpoint(&self.base_url, &[T::RESOURCE.path]),
        }
    }

    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let session = self.session.current().ok_or(ClientError::SignedOut)?;
        Ok(req
            .bearer_auth(&session.token)
            .query(&[("vendorId", session.vendor_id.as_str())]))
    }
}

impl<T: Entity> CollectionClient<T> for RestCollection<T> {
    async fn list(&self, params: &ListParams) -> Result<Vec<T>> {
        let url = self.url(None)?;
        tracing::debug!(%url, "GET collection");
        let req = self.authorize(self.http.get(url))?.query(params.pairs());
        let res = send(req).await?;
        match read_body(res).await? {
            Some(body) => decode_list(body, &T::RESOURCE),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch(&self, id: &str) -> Result<T> {
        let url = self.url(Some(id))?;
        tracing::debug!(%url, "GET record");
        let res = send(self.authorize(self.http.get(url))?).await?;
        let body = read_body(res)
            .await?
            .ok_or_else(|| ClientError::InvalidResponse("empty body".to_string()))?;
        decode_item(body, &T::RESOURCE)
    }

    async fn create(&self, payload: &Value) -> Result<T> {
        let url = self.url(None)?;
        tracing::debug!(%url, "POST record");
        let res = send(self.authorize(self.http.post(url).json(payload))?).await?;
        let body = read_body(res)
            .await?
            .ok_or_else(|| ClientError::InvalidResponse("empty body".to_string()))?;
        decode_item(body, &T::RESOURCE)
    }

    async fn update(&self, id: &str, patch: &Value) -> Result<T> {
        let url = self.url(Some(id))?;
        tracing::debug!(%url, "PATCH record");
        let res = send(self.authorize(self.http.patch(url).json(patch))?).await?;

        // Some endpoints only acknowledge the write; read the record back.
        match read_body(res).await? {
            Some(body) => match decode_item(body, &T::RESOURCE) {
                Ok(item) => Ok(item),
                Err(err) => {
                    tracing::debug!("update of {id} returned no record ({err}), fetching it");
                    self.fetch(id).await
                }
            },
            None => self.fetch(id).await,
        }
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let url = self.url(Some(id))?;
        tracing::debug!(%url, "DELETE record");
        send(self.authorize(self.http.delete(url))?).await?;
        Ok(())
    }
}

/// Exchanges vendor credentials for a [`Session`].
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: Url,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http: reqwest::Client::new(),
        })
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Email and password are required.".to_string(),
            ));
        }

        let url = endpoint(&self.base_url, &["auth", "login"])?;
        tracing::debug!(%url, "POST login");
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let res = send(self.http.post(url).json(&payload)).await?;
        let body = read_body(res)
            .await?
            .ok_or_else(|| ClientError::InvalidResponse("empty body".to_string()))?;
        let login: LoginResponse = serde_json::from_value(body)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

        Ok(Session {
            token: login.token,
            vendor_id: login.vendor.id,
            email: email.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use api_types::medicine::Medicine;
    use serde_json::json;

    use super::*;

    #[test]
    fn list_bodies_may_be_wrapped() {
        let resource = Medicine::RESOURCE;
        let bare: Vec<Medicine> = decode_list(json!([{"_id": "a"}]), &resource).unwrap();
        assert_eq!(bare.len(), 1);

        let keyed: Vec<Medicine> =
            decode_list(json!({"medicines": [{"_id": "a"}, {"_id": "b"}]}), &resource).unwrap();
        assert_eq!(keyed.len(), 2);

        let data: Vec<Medicine> = decode_list(json!({"data": []}), &resource).unwrap();
        assert!(data.is_empty());

        let missing = decode_list::<Medicine>(json!({"items": []}), &resource);
        assert!(matches!(missing, Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn item_bodies_may_be_wrapped() {
        let resource = Medicine::RESOURCE;
        let bare: Medicine = decode_item(json!({"_id": "a", "name": "X"}), &resource).unwrap();
        assert_eq!(bare.name, "X");

        let keyed: Medicine = decode_item(
            json!({"message": "updated", "medicine": {"_id": "a", "name": "Y"}}),
            &resource,
        )
        .unwrap();
        assert_eq!(keyed.name, "Y");

        let ack = decode_item::<Medicine>(json!({"message": "updated"}), &resource);
        assert!(ack.is_err());
    }

    #[test]
    fn endpoints_keep_base_path_and_escape_ids() {
        let base = parse_base_url("http://localhost:4000/api/vendor").unwrap();
        let url = endpoint(&base, &["orders", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/vendor/orders/a%2Fb");

        let base = parse_base_url("http://localhost:4000/").unwrap();
        let url = endpoint(&base, &["orders"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/orders");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:vendor@example.com").is_err());
    }
}
