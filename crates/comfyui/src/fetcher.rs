//! Downloads the binary artifacts referenced by a prompt's history.

use crate::history::ArtifactRef;
use crate::session::{TransportError, TransportSession};

/// A downloaded output file together with the reference it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub reference: ArtifactRef,
    pub data: Vec<u8>,
}

/// Fetches artifacts over a session's unary channel (`GET /view`).
///
/// Stateless: no retry, no caching. The same reference yields the same
/// bytes for as long as the server keeps the file.
pub struct ArtifactFetcher<'a, S> {
    session: &'a S,
}

impl<'a, S: TransportSession> ArtifactFetcher<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Download the raw bytes of one artifact.
    pub async fn fetch(&self, reference: &ArtifactRef) -> Result<Vec<u8>, TransportError> {
        let query = [
            ("filename", reference.filename.as_str()),
            ("subfolder", reference.subfolder.as_str()),
            ("type", reference.kind.as_str()),
        ];
        let data = self.session.fetch("/view", &query).await?;

        tracing::debug!(
            client_id = %self.session.client_id(),
            filename = %reference.filename,
            bytes = data.len(),
            "Fetched artifact",
        );
        Ok(data)
    }
}
