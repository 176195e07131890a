//! Transport layer: turn an axum request into an [`IncomingRequest`].
//!
//! The body is read as `multipart/form-data`. The `input` file part is
//! spooled to disk and classified with an [`UploadStatus`]; text parts are
//! decoded to UTF-8. Nothing here produces an HTTP response: every anomaly
//! is recorded on the request and left to the validator.

use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::disposition;
use super::encoding::FieldCodec;
use super::{INPUT_KEY, IncomingRequest, SpooledFile, UploadSlot, UploadStatus};
use crate::limits::UploadLimits;
use crate::state::AppState;

/// What to do after a part has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// The multipart stream broke; nothing more can be read.
    Stop,
    /// The body outgrew `post_max_size`.
    Overflow,
}

impl IncomingRequest {
    pub async fn from_http(request: Request, state: &AppState) -> Self {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let mut incoming = Self::new(request.method().clone(), declared);

        if declared.is_some_and(|len| len > state.upload_limit) {
            debug!(
                content_length = declared,
                limit = state.upload_limit,
                "declared body exceeds the upload limit; not reading it"
            );
            return incoming;
        }

        let mut multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(rejection) => {
                debug!(error = %rejection, "request body is not multipart/form-data");
                return incoming;
            }
        };

        let mut reader = FormReader {
            codec: state.codec,
            limits: state.config.limits,
            upload_dir: &state.config.upload_dir,
            received: 0,
        };
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "malformed multipart body");
                    break;
                }
            };
            let (name, file_name) = reader.part_names(&field);

            let flow = match (name, file_name) {
                (Some(name), Some(file_name)) if name == INPUT_KEY && incoming.upload.is_none() => {
                    let (slot, flow) = reader.spool(field, file_name).await;
                    incoming.upload = Some(slot);
                    flow
                }
                (Some(name), None) => match reader.text(field).await {
                    Ok(value) => {
                        incoming.fields.insert(name, value);
                        Flow::Continue
                    }
                    Err(flow) => flow,
                },
                _ => reader.drain(field).await,
            };

            match flow {
                Flow::Continue => {}
                Flow::Stop => break,
                Flow::Overflow => {
                    debug!(
                        received = reader.received,
                        limit = reader.limits.post_max_size,
                        "request body exceeds post_max_size; stopped reading"
                    );
                    incoming.content_length = Some(declared.unwrap_or(0).max(reader.received));
                    break;
                }
            }
        }

        debug!(
            fields = incoming.fields.len(),
            upload = incoming.upload.is_some(),
            received = reader.received,
            "request body read"
        );
        incoming
    }
}

struct FormReader<'a> {
    codec: FieldCodec,
    limits: UploadLimits,
    upload_dir: &'a Path,
    received: u64,
}

impl FormReader<'_> {
    /// Count `len` more body bytes; false once the body is over budget.
    fn take(&mut self, len: usize) -> bool {
        self.received = self.received.saturating_add(len as u64);
        self.received <= self.limits.post_max_size
    }

    /// Part name and filename, decoded from the raw `content-disposition`
    /// bytes so names in the input encoding survive.
    fn part_names(&self, field: &Field<'_>) -> (Option<String>, Option<String>) {
        match field.headers().get(header::CONTENT_DISPOSITION) {
            Some(raw) => {
                let names = disposition::parse(raw.as_bytes());
                (
                    names.name.map(|n| self.codec.decode(&n)),
                    names.filename.map(|n| self.codec.decode(&n)),
                )
            }
            None => (
                field.name().map(|n| self.codec.decode(n.as_bytes())),
                field.file_name().map(|n| self.codec.decode(n.as_bytes())),
            ),
        }
    }

    async fn spool(&mut self, mut field: Field<'_>, declared_name: String) -> (UploadSlot, Flow) {
        let storage = SpooledFile::new(self.upload_dir.join(format!("dictapi_upload_{}", Uuid::new_v4())));

        if declared_name.is_empty() {
            debug!("file part has an empty filename");
            let flow = self.drain(field).await;
            return (UploadSlot::new(declared_name, storage, UploadStatus::NoFile, 0), flow);
        }

        let dir_exists = tokio::fs::metadata(self.upload_dir)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if !dir_exists {
            warn!(upload_dir = %self.upload_dir.display(), "upload directory does not exist");
            let flow = self.drain(field).await;
            return (UploadSlot::new(declared_name, storage, UploadStatus::NoTmpDir, 0), flow);
        }

        let mut file = match tokio::fs::File::create(storage.path()).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %storage.path().display(), error = %e, "failed to create spooled upload");
                let flow = self.drain(field).await;
                return (UploadSlot::new(declared_name, storage, UploadStatus::CantWrite, 0), flow);
            }
        };

        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, received = size, "upload ended mid-file");
                    return (UploadSlot::new(declared_name, storage, UploadStatus::Partial, size), Flow::Stop);
                }
            };
            if !self.take(chunk.len()) {
                return (
                    UploadSlot::new(declared_name, storage, UploadStatus::Partial, size),
                    Flow::Overflow,
                );
            }
            size += chunk.len() as u64;
            if size > self.limits.upload_max_filesize {
                debug!(
                    received = size,
                    limit = self.limits.upload_max_filesize,
                    "uploaded file exceeds upload_max_filesize"
                );
                drop(file);
                let flow = self.drain(field).await;
                return (UploadSlot::new(declared_name, storage, UploadStatus::IniSize, size), flow);
            }
            if let Err(e) = file.write_all(&chunk).await {
                warn!(path = %storage.path().display(), error = %e, "failed to write spooled upload");
                drop(file);
                let flow = self.drain(field).await;
                return (UploadSlot::new(declared_name, storage, UploadStatus::CantWrite, size), flow);
            }
        }
        if let Err(e) = file.flush().await {
            warn!(path = %storage.path().display(), error = %e, "failed to flush spooled upload");
            return (UploadSlot::new(declared_name, storage, UploadStatus::CantWrite, size), Flow::Continue);
        }

        debug!(file_name = %declared_name, size, "spooled upload");
        (UploadSlot::new(declared_name, storage, UploadStatus::Ok, size), Flow::Continue)
    }

    async fn text(&mut self, mut field: Field<'_>) -> Result<String, Flow> {
        let mut raw = Vec::new();
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if !self.take(chunk.len()) {
                        return Err(Flow::Overflow);
                    }
                    raw.extend_from_slice(&chunk);
                }
                Ok(None) => return Ok(self.codec.decode(&raw)),
                Err(e) => {
                    debug!(error = %e, "text field ended early");
                    return Err(Flow::Stop);
                }
            }
        }
    }

    /// Consume a part we have no use for, still counting its bytes.
    async fn drain(&mut self, mut field: Field<'_>) -> Flow {
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if !self.take(chunk.len()) {
                        return Flow::Overflow;
                    }
                }
                Ok(None) => return Flow::Continue,
                Err(e) => {
                    debug!(error = %e, "multipart part ended early");
                    return Flow::Stop;
                }
            }
        }
    }
}
