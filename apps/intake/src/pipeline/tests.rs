use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::error::ErrorKind;
use super::*;
use crate::config::DEFAULT_PUBLIC_BASE_URL;
use crate::extraction::docx::fixtures::docx_with_paragraphs;
use crate::extraction::pdf::fixtures::pdf_with_pages;

// ────────────────────────────────────────────────────────────────────────────
// Fakes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeStorage {
    objects: HashMap<(String, String), Bytes>,
    transient_failure: bool,
    calls: AtomicUsize,
}

impl FakeStorage {
    fn with(container: &str, object_id: &str, bytes: Vec<u8>) -> Self {
        let mut storage = Self::default();
        storage
            .objects
            .insert((container.to_string(), object_id.to_string()), Bytes::from(bytes));
        storage
    }
}

#[async_trait]
impl StorageFetcher for FakeStorage {
    async fn fetch(&self, container: &str, object_id: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.transient_failure {
            return Err(FetchError::Io("connection reset".to_string()));
        }
        self.objects
            .get(&(container.to_string(), object_id.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                container: container.to_string(),
                object_id: object_id.to_string(),
            })
    }
}

/// In-memory store. `scripted` errors are returned (front first) before any
/// real insert happens.
#[derive(Default)]
struct MemoryStore {
    records: Mutex<HashMap<String, ApplicationRecord>>,
    scripted: Mutex<VecDeque<PersistError>>,
    inserts: AtomicUsize,
}

impl MemoryStore {
    fn failing_with(errors: Vec<PersistError>) -> Self {
        Self {
            scripted: Mutex::new(errors.into()),
            ..Default::default()
        }
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &ApplicationRecord) -> Result<(), PersistError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.scripted.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut records = self.records.lock().unwrap();
        match records.get(&record.application_id) {
            Some(existing) if existing == record => Ok(()),
            Some(_) => Err(PersistError::DuplicateId(record.application_id.clone())),
            None => {
                records.insert(record.application_id.clone(), record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, application_id: &str) -> Result<Option<ApplicationRecord>, PersistError> {
        Ok(self.records.lock().unwrap().get(application_id).cloned())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        to_email: &str,
        display_name: &str,
        application_id: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((
            to_email.to_string(),
            display_name.to_string(),
            application_id.to_string(),
        ));
        if self.fail {
            return Err(NotifyError("mail API returned 503".to_string()));
        }
        Ok(())
    }
}

struct Harness {
    storage: Arc<FakeStorage>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    pipeline: Pipeline,
}

fn harness(storage: FakeStorage, store: MemoryStore, notifier: RecordingNotifier) -> Harness {
    let storage = Arc::new(storage);
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let pipeline = Pipeline::new(
        storage.clone(),
        store.clone(),
        notifier.clone(),
        ApplicationBuilder::new(DEFAULT_PUBLIC_BASE_URL),
    );
    Harness {
        storage,
        store,
        notifier,
        pipeline,
    }
}

fn jane_pdf() -> Vec<u8> {
    pdf_with_pages(&[
        Some("Contact: Jane Doe jane.doe@example.com"),
        Some("(415) 555-0100"),
    ])
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf_event_is_persisted_and_confirmed() {
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let processed = h
        .pipeline
        .process(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap();
    let record = &processed.record;

    assert_eq!(record.name.as_deref(), Some("Jane Doe"));
    assert_eq!(record.email.as_deref(), Some("jane.doe@example.com"));
    assert_eq!(record.phone.as_deref(), Some("+14155550100"));
    assert_eq!(record.cv_url, "https://storage.googleapis.com/cvs/jane.pdf");
    assert_eq!(processed.notification, NotificationStatus::Sent);

    let sent = h.notifier.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![(
            "jane.doe@example.com".to_string(),
            "Jane Doe".to_string(),
            record.application_id.clone()
        )]
    );
}

#[tokio::test]
async fn test_persisted_record_reads_back_equal() {
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let record = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap();
    let stored = h.store.get(&record.application_id).await.unwrap();
    assert_eq!(stored, Some(record));
}

#[tokio::test]
async fn test_docx_without_contact_details_skips_notification() {
    let bytes = docx_with_paragraphs(&["summary", "shipped things, fixed things.", "hobbies: chess"]);
    let h = harness(
        FakeStorage::with("cvs", "anon.docx", bytes),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let processed = h
        .pipeline
        .process(&DocumentEvent::new("cvs", "anon.docx"))
        .await
        .unwrap();

    assert_eq!(processed.record.name, None);
    assert_eq!(processed.record.email, None);
    assert_eq!(processed.record.phone, None);
    assert_eq!(processed.notification, NotificationStatus::Skipped);
    assert_eq!(h.store.len(), 1);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_name_falls_back_to_applicant() {
    let bytes = docx_with_paragraphs(&["contact: someone@example.org"]);
    let h = harness(
        FakeStorage::with("cvs", "cv.docx", bytes),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    h.pipeline
        .handle(&DocumentEvent::new("cvs", "cv.docx"))
        .await
        .unwrap();

    let sent = h.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, FALLBACK_DISPLAY_NAME);
}

#[tokio::test]
async fn test_fetch_failure_has_no_side_effects() {
    let h = harness(
        FakeStorage::default(),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "gone.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Fetch);
    assert_eq!(err.stage, Stage::Fetched);
    assert_eq!(err.event_ref, "cvs/gone.pdf");
    assert!(err.is_retryable());
    assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_fetch_error_is_retryable() {
    let storage = FakeStorage {
        transient_failure: true,
        ..Default::default()
    };
    let h = harness(storage, MemoryStore::default(), RecordingNotifier::default());

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.storage.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_pdf_is_terminal_and_not_persisted() {
    let h = harness(
        FakeStorage::with("cvs", "broken.pdf", b"not a pdf at all".to_vec()),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "broken.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Extraction);
    assert_eq!(err.stage, Stage::Extracted);
    assert!(!err.is_retryable());
    assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_format_is_terminal() {
    let h = harness(
        FakeStorage::with("cvs", "cv.txt", b"Jane Doe".to_vec()),
        MemoryStore::default(),
        RecordingNotifier::default(),
    );

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "cv.txt").with_content_type("text/plain"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnsupportedFormat);
    assert!(!err.is_retryable());
    assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_notification_failure_still_succeeds() {
    let notifier = RecordingNotifier {
        fail: true,
        ..Default::default()
    };
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        MemoryStore::default(),
        notifier,
    );

    let processed = h
        .pipeline
        .process(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap();

    assert!(matches!(processed.notification, NotificationStatus::Failed(_)));
    let stored = h.store.get(&processed.record.application_id).await.unwrap();
    assert_eq!(stored, Some(processed.record));
}

#[tokio::test]
async fn test_persist_failure_is_retryable_and_skips_notification() {
    let store = MemoryStore::failing_with(vec![PersistError::Backend("pool timed out".into())]);
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        store,
        RecordingNotifier::default(),
    );

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Persist);
    assert_eq!(err.stage, Stage::Persisted);
    assert!(err.is_retryable());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_id_is_regenerated_once() {
    let store = MemoryStore::failing_with(vec![PersistError::DuplicateId("APP-00000000".into())]);
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        store,
        RecordingNotifier::default(),
    );

    let record = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap();

    assert_eq!(h.store.inserts.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.get(&record.application_id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_second_duplicate_id_gives_up() {
    let store = MemoryStore::failing_with(vec![
        PersistError::DuplicateId("APP-00000000".into()),
        PersistError::DuplicateId("APP-11111111".into()),
    ]);
    let h = harness(
        FakeStorage::with("cvs", "jane.pdf", jane_pdf()),
        store,
        RecordingNotifier::default(),
    );

    let err = h
        .pipeline
        .handle(&DocumentEvent::new("cvs", "jane.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::DuplicateId);
    assert!(!err.is_retryable());
    assert_eq!(h.store.inserts.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let mut storage = FakeStorage::default();
    for i in 0..8 {
        storage.objects.insert(
            ("cvs".to_string(), format!("cv-{i}.docx")),
            Bytes::from(docx_with_paragraphs(&["Jane Doe", "jane.doe@example.com"])),
        );
    }
    let h = Arc::new(harness(storage, MemoryStore::default(), RecordingNotifier::default()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.pipeline
                .handle(&DocumentEvent::new("cvs", format!("cv-{i}.docx")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.store.len(), 8);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 8);
}
