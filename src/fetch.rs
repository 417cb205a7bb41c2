use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::atom_mappings::{self, AtomMapping, AtomMappingSource};
use crate::config::ResolvedConfig;
use crate::error::CycError;
use crate::identity::{Detail, Identity};
use crate::record::Record;
use crate::xml::Document;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Source of raw `ptools-xml` documents, one per identity and detail level.
pub trait DocumentFetcher: Send + Sync {
    fn fetch_document(&self, identity: &Identity, detail: Option<Detail>)
    -> Result<Document, CycError>;
}

impl<T: DocumentFetcher + ?Sized> DocumentFetcher for Arc<T> {
    fn fetch_document(
        &self,
        identity: &Identity,
        detail: Option<Detail>,
    ) -> Result<Document, CycError> {
        (**self).fetch_document(identity, detail)
    }
}

/// HTTP client for the BioCyc web services.
#[derive(Clone)]
pub struct WebServiceClient {
    client: Client,
    base_url: String,
    atom_mapping_url: String,
    max_retries: usize,
    retry_delay: Duration,
}

impl WebServiceClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, CycError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-cyc/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CycError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| CycError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            atom_mapping_url: config.atom_mapping_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    pub fn getxml_url(&self, identity: &Identity, detail: Option<Detail>) -> String {
        getxml_url(&self.base_url, identity, detail)
    }

    pub fn atom_mappings_url(&self, identity: &Identity) -> String {
        atom_mappings_url(&self.atom_mapping_url, identity)
    }

    pub fn apixml_url(&self, function: &str, identity: &Identity, detail: Option<Detail>) -> String {
        apixml_url(&self.base_url, function, identity, detail)
    }

    pub fn xmlquery_url(&self, query: &str, detail: Option<Detail>) -> Result<String, CycError> {
        xmlquery_url(&self.base_url, query, detail)
    }

    /// Objects returned by a Pathway Tools API function such as
    /// `genes-of-pathway` applied to `identity`.
    pub fn apixml(
        &self,
        function: &str,
        identity: &Identity,
        detail: Option<Detail>,
    ) -> Result<Vec<Record>, CycError> {
        let document = self.get_document(&self.apixml_url(function, identity, detail))?;
        Record::parse_all(&document)
    }

    /// Objects returned by a BioVelo query.
    pub fn xmlquery(&self, query: &str, detail: Option<Detail>) -> Result<Vec<Record>, CycError> {
        let document = self.get_document(&self.xmlquery_url(query, detail)?)?;
        Record::parse_all(&document)
    }

    /// Downloads and decodes the atom mappings of a reaction.
    pub fn download_atom_mappings(&self, identity: &Identity) -> Result<Vec<AtomMapping>, CycError> {
        let url = self.atom_mappings_url(identity);
        debug!(%url, "downloading atom mappings");
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| CycError::Http(err.to_string()))?;
        atom_mappings::parse(&decode_body(&bytes)?)
    }

    fn get_document(&self, url: &str) -> Result<Document, CycError> {
        debug!(%url, "GET ptools-xml");
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| CycError::Http(err.to_string()))?;
        Document::parse(&decode_body(&bytes)?)
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, CycError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        attempt += 1;
                        warn!(status, attempt, "retrying BioCyc request");
                        std::thread::sleep(self.retry_delay * attempt as u32);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        attempt += 1;
                        warn!(error = %err, attempt, "retrying BioCyc request");
                        std::thread::sleep(self.retry_delay * attempt as u32);
                        continue;
                    }
                    return Err(CycError::Http(err.to_string()));
                }
            }
        }
    }

    fn handle_status(response: Response) -> Result<Response, CycError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "BioCyc request failed".to_string());
        Err(CycError::Status { status, message })
    }
}

impl DocumentFetcher for WebServiceClient {
    fn fetch_document(
        &self,
        identity: &Identity,
        detail: Option<Detail>,
    ) -> Result<Document, CycError> {
        self.get_document(&self.getxml_url(identity, detail))
    }
}

impl AtomMappingSource for WebServiceClient {
    fn atom_mappings(&self, reaction: &Identity) -> Result<Vec<AtomMapping>, CycError> {
        self.download_atom_mappings(reaction)
    }
}

/// `getxml` endpoint. Identities go out in their escaped form.
pub fn getxml_url(base_url: &str, identity: &Identity, detail: Option<Detail>) -> String {
    match detail {
        Some(detail) => format!(
            "{base_url}/getxml?id={}:{}&detail={}",
            identity.realm(),
            identity.frame(),
            detail.as_str()
        ),
        None => format!("{base_url}/getxml?{}:{}", identity.realm(), identity.frame()),
    }
}

/// `apixml` endpoint: a Pathway Tools API function applied to one object.
pub fn apixml_url(
    base_url: &str,
    function: &str,
    identity: &Identity,
    detail: Option<Detail>,
) -> String {
    let url = format!(
        "{base_url}/apixml?fn={function}&id={}:{}",
        identity.realm(),
        identity.frame()
    );
    match detail {
        Some(detail) => format!("{url}&detail={}", detail.as_str()),
        None => url,
    }
}

/// `xmlquery` endpoint. The BioVelo query is percent-encoded.
pub fn xmlquery_url(base_url: &str, query: &str, detail: Option<Detail>) -> Result<String, CycError> {
    let mut url = Url::parse(&format!("{base_url}/xmlquery"))
        .map_err(|err| CycError::Http(format!("{base_url}: {err}")))?;
    match detail {
        Some(detail) => {
            url.query_pairs_mut()
                .append_pair("query", query)
                .append_pair("detail", detail.as_str());
        }
        None => url.set_query(Some(query)),
    }
    Ok(url.to_string())
}

pub fn atom_mappings_url(base_url: &str, identity: &Identity) -> String {
    format!(
        "{base_url}/{}/download-atom-mappings?object={}",
        identity.realm(),
        identity.frame()
    )
}

/// Response bodies are gzip-compressed unless a proxy already inflated them.
pub fn decode_body(bytes: &[u8]) -> Result<String, CycError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .map_err(|err| CycError::Decode(err.to_string()))?;
        return Ok(text);
    }
    String::from_utf8(bytes.to_vec()).map_err(|err| CycError::Decode(err.to_string()))
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
