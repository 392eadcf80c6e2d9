use std::collections::BTreeMap;

use url::Url;

use super::types::Client;

/// Parameters the authorize request always carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeParam {
    ClientId,
    RedirectUri,
    Scope,
    ResponseType,
}

impl AuthorizeParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::RedirectUri => "redirect_uri",
            Self::Scope => "scope",
            Self::ResponseType => "response_type",
        }
    }
}

/// Query string of the authorize request.
///
/// Extra parameters replace a default of the same name in place, and are
/// appended otherwise. This lets negative checks send malformed values.
#[derive(Debug, Clone)]
pub struct AuthorizeQuery {
    client_id: String,
    redirect_uri: String,
    scopes: Option<Vec<String>>,
    response_type: String,
    extra: BTreeMap<String, String>,
}

impl AuthorizeQuery {
    pub fn new(client: &Client) -> Self {
        Self {
            client_id: client.client_id.clone(),
            redirect_uri: client.redirect_uri.clone(),
            scopes: None,
            response_type: "code".to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// Requests `scopes`. An empty list omits the parameter.
    pub fn scopes(mut self, scopes: &[String]) -> Self {
        self.scopes = if scopes.is_empty() {
            None
        } else {
            Some(scopes.to_vec())
        };
        self
    }

    pub fn extra_params(mut self, extra: &BTreeMap<String, String>) -> Self {
        self.extra
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    fn default_pairs(&self) -> Vec<(AuthorizeParam, String)> {
        let mut pairs = vec![
            (AuthorizeParam::ClientId, self.client_id.clone()),
            (AuthorizeParam::RedirectUri, self.redirect_uri.clone()),
        ];
        if let Some(scopes) = &self.scopes {
            pairs.push((AuthorizeParam::Scope, scopes.join(" ")));
        }
        pairs.push((AuthorizeParam::ResponseType, self.response_type.clone()));
        pairs
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .default_pairs()
            .into_iter()
            .map(|(param, value)| {
                let value = self
                    .extra
                    .get(param.as_str())
                    .cloned()
                    .unwrap_or(value);
                (param.as_str().to_string(), value)
            })
            .collect();

        for (key, value) in &self.extra {
            if !pairs.iter().any(|(k, _)| k == key) {
                pairs.push((key.clone(), value.clone()));
            }
        }
        pairs
    }

    /// `endpoint` with this query appended to any query it already has.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut().extend_pairs(self.to_pairs());
        url
    }
}
