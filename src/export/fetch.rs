//! Authenticated streaming download of message resources.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::export::attachments::AttachmentRef;
use crate::session::Session;

/// Downloads message resources through the platform's resource endpoint.
///
/// The underlying client has no request timeout so large files are never cut
/// short; failed downloads are not retried.
#[derive(Debug, Clone)]
pub struct AttachmentFetcher {
    http: Client,
}

impl AttachmentFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("lark_dumper/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self { http })
    }

    /// Resource path for one attachment of one message.
    pub fn resource_path(attachment: &AttachmentRef) -> String {
        format!(
            "/open-apis/im/v1/messages/{}/resources/{}?type={}",
            attachment.message_id, attachment.key, attachment.kind
        )
    }

    /// Stream one attachment into `sink`, returning the number of bytes written.
    pub async fn fetch<S, W>(
        &self,
        session: &S,
        attachment: &AttachmentRef,
        sink: &mut W,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let token = session.access_token().await?;
        let url = session.expand_url(&Self::resource_path(attachment));

        let response = self
            .http
            .get(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::DownloadStatus(response.status().as_u16()));
        }

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        debug!(
            message_id = %attachment.message_id,
            key = %attachment.key,
            bytes = written,
            "Downloaded attachment"
        );
        Ok(written)
    }
}
