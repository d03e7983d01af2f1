//! Import submission
//!
//! Validates the form, fingerprints the file and uploads everything in one
//! multipart request. The service decides whether an import exists; nothing
//! is recorded locally, whatever the outcome.

use crate::api::{CreateImportRequest, ImportRepository};
use crate::error::{CliError, FingerprintError, Result};
use crate::fingerprint::{Fingerprinter, Sha256Fingerprinter};
use bytes::Bytes;
use std::path::Path;
use tracing::{info, instrument, warn};

/// A file picked for upload, held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    contents: Bytes,
}

impl SelectedFile {
    /// Read a file from disk
    ///
    /// The stored name is the file name only, never the directory.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|source| CliError::FileUnreadable {
                path: path.display().to_string(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::from_bytes(name, contents))
    }

    pub fn from_bytes(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the file bytes; cloning does not copy them
    pub fn contents(&self) -> Bytes {
        self.contents.clone()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Fields of the import form
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub file: Option<SelectedFile>,
    /// Target fund; required
    pub fidc_id: Option<String>,
    /// Declared source format (e.g. Cnab, Xml, Zip, Excel)
    pub origem: Option<String>,
    pub tipo_banco: Option<String>,
    pub tipo_cnab: Option<String>,
    pub modalidade: Option<String>,
    pub cedente_id: Option<String>,
}

impl SubmissionForm {
    /// Check the required fields without touching the network
    pub fn validate(&self) -> Result<(&SelectedFile, &str)> {
        let file = self.file.as_ref().ok_or_else(|| {
            CliError::validation("No file selected. Choose the file to import and try again.")
        })?;

        let fidc_id = self
            .fidc_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CliError::validation("A target fund is required. Pass --fidc-id with the fund identifier.")
            })?;

        Ok((file, fidc_id))
    }

    fn request(&self, file: &SelectedFile, fidc_id: &str, file_hash: Option<String>) -> CreateImportRequest {
        CreateImportRequest {
            file_name: file.name().to_string(),
            contents: file.contents(),
            fidc_id: fidc_id.to_string(),
            origem: trimmed(&self.origem),
            tipo_banco: trimmed(&self.tipo_banco),
            tipo_cnab: trimmed(&self.tipo_cnab),
            modalidade: trimmed(&self.modalidade),
            cedente_id: trimmed(&self.cedente_id),
            file_hash,
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub import_id: String,
    pub file_name: String,
    /// Fingerprint sent with the upload
    pub file_hash: Option<String>,
    /// Why no fingerprint was sent, when hashing failed
    pub fingerprint_error: Option<FingerprintError>,
}

/// Drives a form through validation, fingerprinting and upload
pub struct SubmissionController<R, F = Sha256Fingerprinter> {
    repository: R,
    fingerprinter: F,
}

impl<R: ImportRepository> SubmissionController<R> {
    pub fn new(repository: R) -> Self {
        Self::with_fingerprinter(repository, Sha256Fingerprinter)
    }
}

impl<R: ImportRepository, F: Fingerprinter> SubmissionController<R, F> {
    pub fn with_fingerprinter(repository: R, fingerprinter: F) -> Self {
        Self {
            repository,
            fingerprinter,
        }
    }

    /// Submit the form and return the id of the created import
    ///
    /// On success the form's file selection is cleared and the other fields
    /// are kept for the next upload. On error the form is left untouched.
    #[instrument(skip_all, fields(fidc_id = ?form.fidc_id))]
    pub async fn submit(&self, form: &mut SubmissionForm) -> Result<SubmissionReceipt> {
        let (file, fidc_id) = form.validate()?;

        let (file_hash, fingerprint_error) = match self.fingerprinter.fingerprint(file).await {
            Ok(hash) => (Some(hash), None),
            Err(e) => {
                warn!(file = %file.name(), error = %e, "Fingerprint failed, uploading without it");
                (None, Some(e))
            },
        };

        let request = form.request(file, fidc_id, file_hash.clone());
        let file_name = request.file_name.clone();
        let import_id = self.repository.create(request).await?;

        info!(import_id = %import_id, file = %file_name, hashed = file_hash.is_some(), "Import submitted");

        form.file = None;

        Ok(SubmissionReceipt {
            import_id,
            file_name,
            file_hash,
            fingerprint_error,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::ListQuery;
    use async_trait::async_trait;
    use fidc_common::fingerprint::fingerprint_bytes;
    use fidc_common::{ImportJob, Page};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    /// Records create calls; every other operation is unused here
    #[derive(Default)]
    struct RecordingRepository {
        created: Mutex<Vec<CreateImportRequest>>,
        fail_with: Option<u16>,
    }

    impl RecordingRepository {
        fn calls(&self) -> Vec<CreateImportRequest> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImportRepository for RecordingRepository {
        async fn list(&self, _query: ListQuery) -> Result<Page<ImportJob>> {
            unreachable!("submission never lists")
        }

        async fn create(&self, request: CreateImportRequest) -> Result<String> {
            self.created.lock().unwrap().push(request);
            match self.fail_with {
                Some(status) => Err(CliError::api(status, Some("fidcId desconhecido".to_string()))),
                None => Ok("imp-1".to_string()),
            }
        }

        async fn get(&self, _id: &str) -> Result<ImportJob> {
            unreachable!("submission never reads")
        }

        async fn reprocess(&self, _id: &str) -> Result<()> {
            unreachable!("submission never reprocesses")
        }
    }

    struct BrokenFingerprinter;

    #[async_trait]
    impl Fingerprinter for BrokenFingerprinter {
        async fn fingerprint(&self, file: &SelectedFile) -> std::result::Result<String, FingerprintError> {
            Err(FingerprintError::new(file.name(), "hashing task panicked"))
        }
    }

    fn filled_form() -> SubmissionForm {
        SubmissionForm {
            file: Some(SelectedFile::from_bytes("lote.rem", b"01REMESSA".to_vec())),
            fidc_id: Some("F1".to_string()),
            origem: Some("Cnab".to_string()),
            tipo_cnab: Some("  ".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_call() {
        let repo = Arc::new(RecordingRepository::default());
        let controller = SubmissionController::new(Arc::clone(&repo));
        let mut form = SubmissionForm {
            fidc_id: Some("F1".to_string()),
            ..Default::default()
        };

        let err = controller.submit(&mut form).await.unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fidc_id_makes_no_call() {
        let repo = Arc::new(RecordingRepository::default());
        let controller = SubmissionController::new(Arc::clone(&repo));
        let mut form = filled_form();
        form.fidc_id = Some("   ".to_string());

        let err = controller.submit(&mut form).await.unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
        assert!(repo.calls().is_empty());
        assert!(form.file.is_some());
    }

    #[tokio::test]
    async fn test_submit_sends_hash_and_clears_file() {
        let repo = Arc::new(RecordingRepository::default());
        let controller = SubmissionController::new(Arc::clone(&repo));
        let mut form = filled_form();
        let selected = form.file.as_ref().unwrap().contents();

        let receipt = controller.submit(&mut form).await.unwrap();

        assert_eq!(receipt.import_id, "imp-1");
        assert_eq!(receipt.file_hash.as_deref(), Some(fingerprint_bytes(b"01REMESSA").as_str()));
        assert!(receipt.fingerprint_error.is_none());
        assert!(form.file.is_none());
        assert_eq!(form.fidc_id.as_deref(), Some("F1"));

        let calls = repo.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_name, "lote.rem");
        assert_eq!(calls[0].origem.as_deref(), Some("Cnab"));
        assert_eq!(calls[0].tipo_cnab, None);
        assert_eq!(calls[0].file_hash, receipt.file_hash);
        // The upload shares the selected buffer
        assert_eq!(calls[0].contents.as_ptr(), selected.as_ptr());
    }

    #[tokio::test]
    async fn test_fingerprint_failure_does_not_block_upload() {
        let repo = Arc::new(RecordingRepository::default());
        let controller = SubmissionController::with_fingerprinter(Arc::clone(&repo), BrokenFingerprinter);
        let mut form = filled_form();

        let receipt = controller.submit(&mut form).await.unwrap();

        assert_eq!(receipt.import_id, "imp-1");
        assert!(receipt.file_hash.is_none());
        assert!(receipt.fingerprint_error.is_some());
        assert_eq!(repo.calls()[0].file_hash, None);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_form() {
        let repo = Arc::new(RecordingRepository {
            fail_with: Some(422),
            ..Default::default()
        });
        let controller = SubmissionController::new(Arc::clone(&repo));
        let mut form = filled_form();

        let err = controller.submit(&mut form).await.unwrap_err();
        assert!(err.to_string().contains("fidcId desconhecido"));
        assert!(form.file.is_some());
    }

    #[tokio::test]
    async fn test_selected_file_from_path() {
        use std::io::Write;

        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"<xml/>").unwrap();
        temp.flush().unwrap();

        let file = SelectedFile::from_path(temp.path()).await.unwrap();
        assert_eq!(&*file.contents(), b"<xml/>");
        assert!(!file.name().contains('/'));

        let missing = SelectedFile::from_path("/definitely/not/here.rem").await;
        assert!(matches!(missing, Err(CliError::FileUnreadable { .. })));
    }
}
