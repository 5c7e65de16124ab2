use std::io::{self, Read, Write};
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::CryoError;
use crate::probe::{AttemptRequest, FetchOutcome, Payload, ProbeClient, StatusClass, classify_status};

/// Fetches from HTTP(S) mirrors and the HTTPS fronts of FTP archive trees.
#[derive(Clone)]
pub struct HttpMirrorClient {
    client: Client,
}

impl HttpMirrorClient {
    pub fn new(timeout: Duration) -> Result<Self, CryoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cryofetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CryoError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| CryoError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn read_document(response: Response) -> Result<Payload, BodyError> {
        let text = response
            .text()
            .map_err(|err| BodyError::Transfer(describe_error(&err)))?;
        if text.trim().is_empty() {
            return Err(BodyError::Transfer("empty response body".to_string()));
        }
        Ok(Payload::Document(text))
    }

    /// Streams the body into a hidden temporary file in `workspace`. Read
    /// failures belong to the mirror; write failures belong to local storage.
    fn stage_body(mut response: Response, workspace: &Utf8Path) -> Result<Payload, BodyError> {
        let mut staged = tempfile::Builder::new()
            .prefix(".cryofetch-")
            .suffix(".part")
            .tempfile_in(workspace.as_std_path())
            .map_err(|err| BodyError::Storage(format!("staging file in {workspace}: {err}")))?;

        let mut buffer = vec![0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let read = match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(BodyError::Transfer(format!("reading body: {err}"))),
            };
            staged
                .write_all(&buffer[..read])
                .map_err(|err| BodyError::Storage(format!("writing staging file: {err}")))?;
            written += read as u64;
        }
        if written == 0 {
            return Err(BodyError::Transfer("empty response body".to_string()));
        }
        Ok(Payload::Staged(staged))
    }
}

enum BodyError {
    Transfer(String),
    Storage(String),
}

impl ProbeClient for HttpMirrorClient {
    fn attempt(&self, request: &AttemptRequest<'_>) -> Result<FetchOutcome, CryoError> {
        let response = match self.client.get(&request.url).send() {
            Ok(response) => response,
            Err(err) => {
                return Ok(FetchOutcome::TransientError {
                    cause: describe_error(&err),
                });
            }
        };

        let status = response.status().as_u16();
        debug!(url = %request.url, status, "mirror responded");
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::NotFound => return Ok(FetchOutcome::NotFoundAtSource),
            StatusClass::Failure => {
                return Ok(FetchOutcome::TransientError {
                    cause: format!("status {status}"),
                });
            }
        }

        let payload = if request.template.response_shape.is_document() {
            Self::read_document(response)
        } else {
            Self::stage_body(response, request.workspace)
        };
        match payload {
            Ok(payload) => Ok(FetchOutcome::Success {
                payload,
                source: request.template.clone(),
            }),
            Err(BodyError::Transfer(cause)) => Ok(FetchOutcome::TransientError { cause }),
            Err(BodyError::Storage(message)) => Err(CryoError::Filesystem(message)),
        }
    }
}

fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
