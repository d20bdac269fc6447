use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use sakkat_admin::api::{ApiError, FormPayload};
use sakkat_admin::media::{FormError, FormSender, FormState, MediaForm, MediaKind, StagedFile};
use serde_json::{json, Value};

/// Records payloads instead of sending them.
#[derive(Default)]
struct RecordingSender {
    calls: AtomicUsize,
    fail_with: Option<String>,
    last: Mutex<Option<FormPayload>>,
}

impl RecordingSender {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormSender for RecordingSender {
    async fn send(&self, payload: FormPayload) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(payload);
        match &self.fail_with {
            Some(message) => Err(ApiError::Http {
                status: reqwest::StatusCode::BAD_REQUEST,
                message: message.clone(),
            }),
            None => Ok(json!({"success": true})),
        }
    }
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://cdn.example.com/{i}.jpg")).collect()
}

fn video(name: &str) -> StagedFile {
    StagedFile::new(name, "video/mp4", Bytes::from_static(b"mp4"))
}

#[tokio::test]
async fn test_create_without_media_fails_without_sending() {
    let sender = RecordingSender::default();
    let mut form = MediaForm::create();

    let err = form
        .submit_with(&[("name", "Ravi".to_string())], &sender)
        .await
        .unwrap_err();

    assert!(matches!(err, FormError::NoMedia));
    assert_eq!(err.to_string(), "Please add at least one image or video.");
    assert_eq!(sender.calls(), 0);
    assert_ne!(form.state(), FormState::Submitting);
}

#[tokio::test]
async fn test_create_with_only_rejected_files_still_fails() {
    let sender = RecordingSender::default();
    let mut form = MediaForm::create();
    let outcome = form
        .add_files(
            MediaKind::Video,
            [StagedFile::new("notes.txt", "text/plain", Bytes::from_static(b"hi"))],
        )
        .unwrap();
    assert_eq!(outcome.rejected, vec!["notes.txt".to_string()]);

    let err = form.submit_with(&[], &sender).await.unwrap_err();
    assert!(matches!(err, FormError::NoMedia));
    assert_eq!(sender.calls(), 0);
}

#[tokio::test]
async fn test_edit_with_everything_removed_succeeds() {
    let sender = RecordingSender::default();
    let existing = urls(3);
    let mut form = MediaForm::edit(existing.clone(), Vec::<String>::new());
    for url in &existing {
        assert!(form.toggle_remove_existing(MediaKind::Image, url).unwrap());
    }

    form.submit_with(&[], &sender).await.unwrap();

    assert_eq!(sender.calls(), 1);
    assert_eq!(form.state(), FormState::Closed);
    let payload = sender.last.lock().unwrap().take().unwrap();
    assert_eq!(payload.texts("removeImages").len(), 3);
    assert!(payload.texts("imagesOrder").is_empty());
}

#[test]
fn test_toggle_twice_restores_item_in_place() {
    let existing = urls(4);
    let mut form = MediaForm::edit(existing.clone(), Vec::<String>::new());

    assert!(form.toggle_remove_existing(MediaKind::Image, &existing[1]).unwrap());
    assert!(form.field(MediaKind::Image).is_removed(&existing[1]));
    assert!(!form.toggle_remove_existing(MediaKind::Image, &existing[1]).unwrap());

    let field = form.field(MediaKind::Image);
    assert!(field.removed().is_empty());
    assert_eq!(field.existing(), existing.as_slice());
    assert_eq!(field.kept(), existing.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn test_reorder_preserves_membership() {
    let existing = urls(5);
    let mut form = MediaForm::edit(existing.clone(), Vec::<String>::new());
    let moves = [(0, 4), (3, 1), (2, 2), (4, 0), (1, 7)];
    for (from, to) in moves {
        form.reorder_existing(MediaKind::Image, from, to).unwrap();
        let now: HashSet<&String> = form.field(MediaKind::Image).existing().iter().collect();
        let before: HashSet<&String> = existing.iter().collect();
        assert_eq!(now, before);
    }
}

#[tokio::test]
async fn test_edit_payload_carries_order_after_reorder_and_removal() {
    let sender = RecordingSender::default();
    let existing = urls(3);
    let mut form = MediaForm::edit(existing.clone(), vec!["https://cdn.example.com/v.mp4".into()]);

    form.reorder_existing(MediaKind::Image, 2, 0).unwrap();
    form.toggle_remove_existing(MediaKind::Image, &existing[0]).unwrap();
    form.add_files(MediaKind::Video, [video("walkthrough.mp4")]).unwrap();

    form.submit_with(&[("name", "Ravi".into())], &sender).await.unwrap();

    let payload = sender.last.lock().unwrap().take().unwrap();
    assert_eq!(payload.texts("name"), vec!["Ravi"]);
    assert_eq!(payload.files("videos").len(), 1);
    assert_eq!(payload.texts("removeImages"), vec![existing[0].as_str()]);
    assert_eq!(
        payload.texts("imagesOrder"),
        vec![existing[2].as_str(), existing[1].as_str()]
    );
    assert_eq!(payload.texts("videosOrder"), vec!["https://cdn.example.com/v.mp4"]);
}

#[tokio::test]
async fn test_failed_submission_keeps_staged_state() {
    let sender = RecordingSender::failing("Farmer not found");
    let existing = urls(2);
    let mut form = MediaForm::edit(existing.clone(), Vec::<String>::new());
    form.toggle_remove_existing(MediaKind::Image, &existing[0]).unwrap();
    form.add_files(MediaKind::Video, [video("a.mp4")]).unwrap();

    let err = form.submit_with(&[], &sender).await.unwrap_err();
    assert_eq!(err.to_string(), "Farmer not found");
    assert_eq!(form.state(), FormState::Editing);
    assert!(form.field(MediaKind::Image).is_removed(&existing[0]));
    assert_eq!(form.field(MediaKind::Video).new_files().len(), 1);

    // Retry goes through once the server accepts it
    let ok = RecordingSender::default();
    form.submit_with(&[], &ok).await.unwrap();
    assert_eq!(form.state(), FormState::Closed);
    assert!(matches!(
        form.add_files(MediaKind::Video, [video("late.mp4")]),
        Err(FormError::Closed)
    ));
}

#[test]
fn test_remove_and_clear_new_files() {
    let mut form = MediaForm::create();
    form.add_files(MediaKind::Video, [video("a.mp4"), video("b.mp4"), video("c.mp4")])
        .unwrap();

    let removed = form.remove_new_file(MediaKind::Video, 1).unwrap();
    assert_eq!(removed.map(|f| f.file_name), Some("b.mp4".to_string()));
    assert!(form.remove_new_file(MediaKind::Video, 9).unwrap().is_none());

    form.clear_new(MediaKind::Video).unwrap();
    assert!(form.field(MediaKind::Video).new_files().is_empty());
}
