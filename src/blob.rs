//! Blob container enumeration and download.
//!
//! Speaks the container's REST surface directly: `comp=list` returns an
//! XML enumeration (optionally windowed by a continuation marker), and a
//! plain GET on the blob URL returns its bytes. Authentication is a SAS
//! token appended to each request's query string.

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use url::Url;

use crate::config::BlobConfig;
use crate::types::PipelineError;

/// Identifier of one object within the container scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Full path-style name, e.g. `420/BackOffice/report final.pdf`.
    pub name: String,
    /// Content length in bytes as reported by the listing.
    pub size: u64,
}

/// Seam between the ingestion loop and the remote container.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Enumerates all blobs under the configured prefix.
    ///
    /// A failure here is batch-level: nothing can proceed without a listing.
    async fn list(&self) -> Result<Vec<BlobRef>, PipelineError>;

    /// Downloads one blob's raw content.
    async fn fetch(&self, blob: &BlobRef) -> Result<Bytes, PipelineError>;
}

/// REST client for a single blob container.
#[derive(Debug, Clone)]
pub struct BlobContainerClient {
    client: Client,
    container_url: Url,
    sas_token: String,
    prefix: String,
}

impl BlobContainerClient {
    pub fn new(client: Client, config: &BlobConfig) -> Self {
        Self {
            client,
            container_url: config.container_url.clone(),
            sas_token: config.sas_token.clone(),
            prefix: config.prefix.clone(),
        }
    }

    fn list_url(&self, marker: Option<&str>) -> Url {
        let mut url = self.container_url.clone();
        url.set_query(Some(self.sas_token.trim_start_matches('?')));
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("restype", "container");
            pairs.append_pair("comp", "list");
            if !self.prefix.is_empty() {
                pairs.append_pair("prefix", &self.prefix);
            }
            if let Some(marker) = marker {
                pairs.append_pair("marker", marker);
            }
        }
        url
    }

    fn blob_url(&self, name: &str) -> Result<Url, PipelineError> {
        let mut url = self.container_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PipelineError::Blob("container URL cannot be a base".into()))?;
            for segment in name.split('/') {
                segments.push(segment);
            }
        }
        url.set_query(Some(self.sas_token.trim_start_matches('?')));
        Ok(url)
    }
}

#[async_trait]
impl DocumentSource for BlobContainerClient {
    async fn list(&self) -> Result<Vec<BlobRef>, PipelineError> {
        let mut blobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let url = self.list_url(marker.as_deref());
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                return Err(PipelineError::Blob(format!(
                    "container listing failed with status {status}"
                )));
            }
            let body = response.text().await?;
            let page = parse_listing(&body)?;
            blobs.extend(page.blobs);

            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        Ok(blobs)
    }

    async fn fetch(&self, blob: &BlobRef) -> Result<Bytes, PipelineError> {
        let url = self.blob_url(&blob.name)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

struct ListingPage {
    blobs: Vec<BlobRef>,
    next_marker: Option<String>,
}

/// Parses one `comp=list` XML response page.
///
/// Only `<Name>` and `<Content-Length>` inside each `<Blob>` element are
/// consumed, plus the trailing `<NextMarker>` for pagination.
fn parse_listing(xml: &str) -> Result<ListingPage, PipelineError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut blobs = Vec::new();
    let mut next_marker = None;

    let mut in_blob = false;
    let mut current_field: Option<&'static str> = None;
    let mut name = String::new();
    let mut size = 0u64;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Blob" => {
                    in_blob = true;
                    name.clear();
                    size = 0;
                }
                b"Name" if in_blob => current_field = Some("name"),
                b"Content-Length" if in_blob => current_field = Some("size"),
                b"NextMarker" => current_field = Some("marker"),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| PipelineError::Blob(format!("unreadable listing: {err}")))?;
                match current_field {
                    Some("name") => name.push_str(&text),
                    Some("size") => {
                        size = text.trim().parse().unwrap_or(0);
                    }
                    Some("marker") => next_marker = Some(text.into_owned()),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Blob" => {
                    if !name.is_empty() {
                        blobs.push(BlobRef {
                            name: std::mem::take(&mut name),
                            size,
                        });
                    }
                    in_blob = false;
                }
                b"Name" | b"Content-Length" | b"NextMarker" => current_field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(PipelineError::Blob(format!("unreadable listing: {err}")));
            }
            _ => {}
        }
    }

    Ok(ListingPage { blobs, next_marker })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="docs">
  <Blobs>
    <Blob>
      <Name>420/BackOffice/report final.pdf</Name>
      <Properties><Content-Length>10240</Content-Length></Properties>
    </Blob>
    <Blob>
      <Name>a.pdf</Name>
      <Properties><Content-Length>512</Content-Length></Properties>
    </Blob>
    <Blob>
      <Name>empty/</Name>
      <Properties><Content-Length>0</Content-Length></Properties>
    </Blob>
  </Blobs>
  <NextMarker>page-2</NextMarker>
</EnumerationResults>"#;

    #[test]
    fn listing_parses_names_sizes_and_marker() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.blobs.len(), 3);
        assert_eq!(page.blobs[0].name, "420/BackOffice/report final.pdf");
        assert_eq!(page.blobs[0].size, 10240);
        assert_eq!(page.blobs[2].size, 0);
        assert_eq!(page.next_marker.as_deref(), Some("page-2"));
    }

    #[test]
    fn listing_without_marker_ends_pagination() {
        let xml = "<EnumerationResults><Blobs></Blobs></EnumerationResults>";
        let page = parse_listing(xml).unwrap();
        assert!(page.blobs.is_empty());
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn blob_url_escapes_each_path_segment() {
        let config = BlobConfig {
            container_url: Url::parse("https://acct.blob.example.net/docs").unwrap(),
            sas_token: "sv=2024&sig=abc".into(),
            prefix: String::new(),
        };
        let client = BlobContainerClient::new(Client::new(), &config);
        let url = client.blob_url("420/BackOffice/report final.pdf").unwrap();
        assert_eq!(
            url.path(),
            "/docs/420/BackOffice/report%20final.pdf"
        );
        assert_eq!(url.query(), Some("sv=2024&sig=abc"));
    }
}
