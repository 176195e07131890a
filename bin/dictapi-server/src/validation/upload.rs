//! Upload checks, run in order and stopping at the first failure:
//!
//! 1. declared (or observed) body length against the effective limit;
//! 2. presence of the `input` slot;
//! 3. the slot's status code, where anything unrecognised is an internal error;
//! 4. collection of the format selectors.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Problem, ProblemKind};
use crate::fault::Fault;
use crate::limits::format_bytes;
use crate::request::{INPUT_KEY, IncomingRequest, UploadStatus};

/// Everything the orchestrator needs from a valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Spooled upload. Owned by the request, which must outlive the conversion.
    pub file: PathBuf,
    /// Filename declared by the client.
    pub filename: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub title: Option<String>,
}

pub fn validate(request: &IncomingRequest, limit: u64) -> Result<Conversion, Problem> {
    debug!(
        method = %request.method,
        content_length = request.content_length,
        fields = request.fields.len(),
        "validating upload"
    );
    if request.content_length.is_some_and(|len| len > limit) {
        debug!(content_length = request.content_length, limit, "request body too large");
        return Err(too_large(limit));
    }

    let Some(slot) = request.upload.as_ref() else {
        return Err(bad_request());
    };
    debug!(file_name = %slot.declared_name, size = slot.declared_size, code = slot.error_code, "upload slot");
    let status = match UploadStatus::try_from(slot.error_code) {
        Ok(status) => status,
        Err(code) => return Err(upload_failed(format!("unrecognised upload error code {code}"))),
    };

    match status {
        UploadStatus::Ok => {}
        UploadStatus::IniSize | UploadStatus::FormSize | UploadStatus::Partial | UploadStatus::NoFile => {
            debug!(?status, "upload rejected by size");
            return Err(too_large(limit));
        }
        UploadStatus::NoTmpDir | UploadStatus::CantWrite | UploadStatus::Extension => {
            return Err(upload_failed(format!(
                "file upload failed with error code {} ({status:?})",
                slot.error_code
            )));
        }
    }

    Ok(Conversion {
        file: slot.storage_path().to_path_buf(),
        filename: slot.declared_name.clone(),
        from: request.field("from").map(str::to_owned),
        to: request.field("to").map(str::to_owned),
        title: request.field("title").map(str::to_owned),
    })
}

fn too_large(limit: u64) -> Problem {
    Problem::new(
        ProblemKind::PayloadTooLarge,
        format!(
            "Failed to upload the file. The file size must not exceed {}.",
            format_bytes(limit)
        ),
    )
}

fn upload_failed(cause: String) -> Problem {
    Problem::internal("Failed to upload the file.", Fault::new("upload", cause))
}

fn bad_request() -> Problem {
    Problem::new(
        ProblemKind::BadRequest,
        format!("Send the dictionary file with the {INPUT_KEY} key."),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::{SpooledFile, UploadSlot};
    use axum::http::Method;

    const LIMIT: u64 = 2 * 1024 * 1024;

    fn request_with(status_code: i64) -> IncomingRequest {
        let mut request = IncomingRequest::new(Method::POST, Some(100));
        let mut slot = UploadSlot::new(
            "animals.csv",
            SpooledFile::new(std::env::temp_dir().join(format!("dictapi-validate-{}", uuid::Uuid::new_v4()))),
            UploadStatus::Ok,
            64,
        );
        slot.error_code = status_code;
        request.upload = Some(slot);
        request
    }

    #[test]
    fn declared_length_over_limit_is_too_large() {
        let mut request = request_with(0);
        request.content_length = Some(LIMIT + 1);
        let problem = validate(&request, LIMIT).unwrap_err();
        assert_eq!(problem.kind(), ProblemKind::PayloadTooLarge);
        assert_eq!(
            problem.detail(),
            "Failed to upload the file. The file size must not exceed 2 MB."
        );
    }

    #[test]
    fn length_check_comes_before_slot_check() {
        let request = IncomingRequest::new(Method::POST, Some(LIMIT + 1));
        assert_eq!(validate(&request, LIMIT).unwrap_err().kind(), ProblemKind::PayloadTooLarge);
    }

    #[test]
    fn missing_slot_is_bad_request() {
        let request = IncomingRequest::new(Method::POST, None);
        let problem = validate(&request, LIMIT).unwrap_err();
        assert_eq!(problem.kind(), ProblemKind::BadRequest);
        assert_eq!(problem.detail(), "Send the dictionary file with the input key.");
    }

    #[test]
    fn unrecognised_code_is_internal_with_fault() {
        for code in [5, 9, -1] {
            let problem = validate(&request_with(code), LIMIT).unwrap_err();
            assert_eq!(problem.kind(), ProblemKind::InternalServerError, "code {code}");
            assert_eq!(problem.detail(), "Failed to upload the file.");
            let fault = problem.fault().unwrap();
            assert_eq!(fault.origin(), "upload");
            assert_eq!(fault.message(), format!("unrecognised upload error code {code}"));
        }
    }

    #[test]
    fn size_related_codes_are_too_large() {
        for status in [
            UploadStatus::IniSize,
            UploadStatus::FormSize,
            UploadStatus::Partial,
            UploadStatus::NoFile,
        ] {
            let problem = validate(&request_with(status.code()), LIMIT).unwrap_err();
            assert_eq!(problem.kind(), ProblemKind::PayloadTooLarge, "{status:?}");
        }
    }

    #[test]
    fn environment_codes_are_internal_with_fault() {
        for status in [UploadStatus::NoTmpDir, UploadStatus::CantWrite, UploadStatus::Extension] {
            let problem = validate(&request_with(status.code()), LIMIT).unwrap_err();
            assert_eq!(problem.kind(), ProblemKind::InternalServerError);
            assert_eq!(problem.detail(), "Failed to upload the file.");
            let fault = problem.fault().unwrap();
            assert_eq!(fault.origin(), "upload");
            assert!(fault.message().contains(&format!("error code {}", status.code())));
        }
    }

    #[test]
    fn valid_request_collects_selectors() {
        let mut request = request_with(0);
        request.fields.insert("from".into(), String::new());
        request.fields.insert("to".into(), "クイズ".into());
        request.fields.insert("title".into(), "動物".into());

        let conversion = validate(&request, LIMIT).unwrap();
        assert_eq!(conversion.filename, "animals.csv");
        assert_eq!(conversion.file, request.upload.as_ref().unwrap().storage_path());
        assert_eq!(conversion.from, None);
        assert_eq!(conversion.to.as_deref(), Some("クイズ"));
        assert_eq!(conversion.title.as_deref(), Some("動物"));
    }
}
