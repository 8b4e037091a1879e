//! Integration tests for `SqliteStore` against an in-memory database.

use marathon_core::{
  exif::ExifData,
  lifecycle::{ParticipantStatus, SubmissionStatus},
  participant::{NewMarathon, NewParticipant, ParticipantKey},
  rule::{Outcome, RuleConfigRecord, RuleKey, Severity, ValidationResult},
  slot::SlotStore,
  store::RecordStore,
  submission::{SubmissionUpdate, UploadedObject},
};
use serde_json::json;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn seeded() -> (SqliteStore, ParticipantKey) {
  let s = store().await;
  s.register_marathon(NewMarathon {
    domain: "spring".into(),
    name:   "Spring Marathon".into(),
    topics: vec!["Bridges".into(), "Shadows".into(), "Red".into()],
  })
  .await
  .unwrap();
  s.register_participant(NewParticipant { domain: "spring".into(), reference: "p-001".into() })
    .await
    .unwrap();
  (s, ParticipantKey::new("spring", "p-001"))
}

fn exif(value: serde_json::Value) -> ExifData {
  match value {
    serde_json::Value::Object(map) => map,
    _ => panic!("exif fixture must be an object"),
  }
}

// ─── Marathons and participants ──────────────────────────────────────────────

#[tokio::test]
async fn register_and_get_marathon() {
  let (s, _) = seeded().await;

  let marathon = s.get_marathon("spring").await.unwrap().unwrap();
  assert_eq!(marathon.name, "Spring Marathon");
  let names: Vec<_> = marathon.topics.iter().map(|t| t.name.as_str()).collect();
  assert_eq!(names, ["Bridges", "Shadows", "Red"]);
  let indexes: Vec<_> = marathon.topics.iter().map(|t| t.order_index).collect();
  assert_eq!(indexes, [0, 1, 2]);

  assert!(s.get_marathon("autumn").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_marathon_domain_is_rejected() {
  let (s, _) = seeded().await;
  let err = s
    .register_marathon(NewMarathon { domain: "spring".into(), name: "Again".into(), topics: vec![] })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MarathonExists(d) if d == "spring"));
}

#[tokio::test]
async fn participant_gets_one_initialized_submission_per_topic() {
  let (s, key) = seeded().await;

  let participant = s.get_participant(&key).await.unwrap().unwrap();
  assert_eq!(participant.status, ParticipantStatus::Initialized);
  assert_eq!(participant.upload_count, 0);

  let submissions = s.submissions(participant.id).await.unwrap();
  assert_eq!(submissions.len(), 3);
  assert!(submissions.iter().all(|sub| sub.status == SubmissionStatus::Initialized));
  assert!(submissions.iter().all(|sub| sub.exif.is_empty() && !sub.uploaded));
  let indexes: Vec<_> = submissions.iter().map(|sub| sub.order_index).collect();
  assert_eq!(indexes, [0, 1, 2]);
}

#[tokio::test]
async fn participant_requires_marathon_and_unique_reference() {
  let (s, _) = seeded().await;

  let missing = s
    .register_participant(NewParticipant { domain: "autumn".into(), reference: "p-001".into() })
    .await
    .unwrap_err();
  assert!(matches!(missing, Error::MarathonNotFound(_)));

  let duplicate = s
    .register_participant(NewParticipant { domain: "spring".into(), reference: "p-001".into() })
    .await
    .unwrap_err();
  assert!(matches!(duplicate, Error::ParticipantExists(_)));
}

#[tokio::test]
async fn status_transitions_follow_the_lifecycle() {
  let (s, key) = seeded().await;

  let p = s.set_participant_status(&key, ParticipantStatus::ReadyToUpload).await.unwrap();
  assert_eq!(p.status, ParticipantStatus::ReadyToUpload);

  let err = s.set_participant_status(&key, ParticipantStatus::Verified).await.unwrap_err();
  assert!(matches!(err, Error::Core(marathon_core::Error::InvalidTransition { .. })));

  let stored = s.get_participant(&key).await.unwrap().unwrap();
  assert_eq!(stored.status, ParticipantStatus::ReadyToUpload);
}

#[tokio::test]
async fn complete_participant_overwrites_upload_count() {
  let (s, key) = seeded().await;
  let id = s.get_participant(&key).await.unwrap().unwrap().id;

  s.complete_participant(id, 2).await.unwrap();
  let p = s.complete_participant(id, 3).await.unwrap().unwrap();
  assert_eq!(p.status, ParticipantStatus::Completed);
  assert_eq!(p.upload_count, 3);

  assert!(matches!(s.complete_participant(999, 1).await, Err(Error::ParticipantNotFound(_))));
}

#[tokio::test]
async fn complete_participant_never_demotes_verified() {
  let (s, key) = seeded().await;
  let id = s.get_participant(&key).await.unwrap().unwrap().id;
  s.complete_participant(id, 2).await.unwrap();
  s.set_participant_status(&key, ParticipantStatus::Verified).await.unwrap();

  assert_eq!(s.complete_participant(id, 5).await.unwrap(), None);

  let stored = s.get_participant(&key).await.unwrap().unwrap();
  assert_eq!(stored.status, ParticipantStatus::Verified);
  assert_eq!(stored.upload_count, 2);
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_upload_sets_object_metadata() {
  let (s, key) = seeded().await;

  let sub = s
    .record_upload(&key.slot(1), UploadedObject {
      key:         "spring/p-001/1/IMG_0042.JPG".into(),
      preview_key: Some("spring/p-001/1/preview.jpg".into()),
      size:        4_200_000,
      mime_type:   "image/jpeg".into(),
    })
    .await
    .unwrap();

  assert_eq!(sub.order_index, 1);
  assert_eq!(sub.file_name(), Some("IMG_0042.JPG"));
  assert_eq!(sub.size, Some(4_200_000));
  assert_eq!(sub.status, SubmissionStatus::Initialized);

  let err = s
    .record_upload(&key.slot(7), UploadedObject {
      key:         "x".into(),
      preview_key: None,
      size:        1,
      mime_type:   "image/jpeg".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SubmissionNotFound(_)));
}

#[tokio::test]
async fn apply_submission_updates_touches_only_addressed_slots() {
  let (s, key) = seeded().await;
  let id = s.get_participant(&key).await.unwrap().unwrap().id;

  let touched = s
    .apply_submission_updates(id, vec![
      SubmissionUpdate {
        order_index:   0,
        status:        SubmissionStatus::Uploaded,
        thumbnail_key: Some("thumb/0.jpg".into()),
        exif:          exif(json!({ "Make": "Canon" })),
        uploaded:      true,
      },
      SubmissionUpdate {
        order_index:   2,
        status:        SubmissionStatus::Uploaded,
        thumbnail_key: None,
        exif:          ExifData::new(),
        uploaded:      true,
      },
    ])
    .await
    .unwrap();
  assert_eq!(touched, 2);

  let subs = s.submissions(id).await.unwrap();
  assert_eq!(subs[0].status, SubmissionStatus::Uploaded);
  assert_eq!(subs[0].thumbnail_key.as_deref(), Some("thumb/0.jpg"));
  assert_eq!(subs[0].exif.get("Make"), Some(&json!("Canon")));
  assert_eq!(subs[1].status, SubmissionStatus::Initialized);
  assert!(!subs[1].uploaded);
  assert!(subs[2].uploaded);
  assert!(subs[2].exif.is_empty());
}

// ─── Rules and findings ──────────────────────────────────────────────────────

#[tokio::test]
async fn rule_configs_upsert_and_filter_disabled() {
  let (s, _) = seeded().await;

  s.save_rule_config("spring", RuleConfigRecord {
    rule_key: RuleKey::MaxFileSize,
    severity: Severity::Warning,
    params:   json!({ "maxBytes": 1000 }),
    enabled:  true,
  })
  .await
  .unwrap();
  s.save_rule_config("spring", RuleConfigRecord {
    rule_key: RuleKey::SameDevice,
    severity: Severity::Error,
    params:   json!({}),
    enabled:  false,
  })
  .await
  .unwrap();
  // Re-saving keeps the original position and replaces the values.
  s.save_rule_config("spring", RuleConfigRecord {
    rule_key: RuleKey::MaxFileSize,
    severity: Severity::Error,
    params:   json!({ "maxBytes": 2000 }),
    enabled:  true,
  })
  .await
  .unwrap();

  let configs = s.enabled_rule_configs("spring").await.unwrap();
  assert_eq!(configs.len(), 1);
  assert_eq!(configs[0].rule_key, RuleKey::MaxFileSize);
  assert_eq!(configs[0].severity, Severity::Error);
  assert_eq!(configs[0].params, json!({ "maxBytes": 2000 }));

  let err = s
    .save_rule_config("autumn", configs[0].clone())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MarathonNotFound(_)));
}

#[tokio::test]
async fn validation_results_are_replaced_wholesale() {
  let (s, key) = seeded().await;
  let id = s.get_participant(&key).await.unwrap().unwrap().id;

  let finding = |outcome, file: Option<&str>| ValidationResult {
    rule_key: RuleKey::MaxFileSize,
    severity: Severity::Error,
    outcome,
    message: "size check".into(),
    file_name: file.map(str::to_owned),
  };

  s.replace_validation_results(id, vec![
    finding(Outcome::Failed, Some("a.jpg")),
    finding(Outcome::Passed, Some("b.jpg")),
  ])
  .await
  .unwrap();
  s.replace_validation_results(id, vec![finding(Outcome::Passed, Some("a.jpg"))])
    .await
    .unwrap();

  let results = s.validation_results(id).await.unwrap();
  assert_eq!(results, vec![finding(Outcome::Passed, Some("a.jpg"))]);
}

// ─── Slot state ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn participant_state_starts_zeroed() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");

  assert!(s.get_participant_state(&key).await.unwrap().is_none());

  let state = s.init_participant_state(&key, 3).await.unwrap();
  assert_eq!(state.processed_indexes, vec![0, 0, 0]);
  assert_eq!(s.get_participant_state(&key).await.unwrap(), Some(state));
}

#[tokio::test]
async fn set_uploaded_is_idempotent() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");
  s.init_participant_state(&key, 3).await.unwrap();

  s.set_uploaded(&key.slot(1)).await.unwrap();
  s.set_uploaded(&key.slot(1)).await.unwrap();

  let state = s.get_participant_state(&key).await.unwrap().unwrap();
  assert_eq!(state.processed_indexes, vec![0, 1, 0]);
  assert_eq!(state.upload_count(), 1);

  let slots = s.get_all_submission_states(&key, &[0, 1, 2]).await.unwrap();
  assert_eq!(slots.len(), 1);
  assert!(slots[0].uploaded);
  assert_eq!(slots[0].order_index, 1);
}

#[tokio::test]
async fn set_uploaded_rejects_unknown_participant_and_index() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");

  let err = s.set_uploaded(&key.slot(0)).await.unwrap_err();
  assert!(matches!(err, Error::Core(marathon_core::Error::ParticipantStateNotFound(_))));

  s.init_participant_state(&key, 2).await.unwrap();
  let err = s.set_uploaded(&key.slot(2)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(marathon_core::Error::IndexOutOfRange { index: 2, len: 2 })
  ));
}

#[tokio::test]
async fn reinit_preserves_processed_entries() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");
  s.init_participant_state(&key, 2).await.unwrap();
  s.set_uploaded(&key.slot(0)).await.unwrap();

  let grown = s.init_participant_state(&key, 4).await.unwrap();
  assert_eq!(grown.processed_indexes, vec![1, 0, 0, 0]);
}

#[tokio::test]
async fn pipelines_write_independently_in_any_order() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");
  s.init_participant_state(&key, 2).await.unwrap();

  let slot = key.slot(0);
  s.set_exif_processed(&slot).await.unwrap();
  s.set_thumbnail(&slot, "thumb/0.jpg").await.unwrap();
  s.set_uploaded(&slot).await.unwrap();
  s.set_thumbnail(&slot, "thumb/0-v2.jpg").await.unwrap();

  let states = s.get_all_submission_states(&key, &[0, 1]).await.unwrap();
  assert_eq!(states.len(), 1);
  assert!(states[0].is_complete());
  assert_eq!(states[0].thumbnail_key.as_deref(), Some("thumb/0-v2.jpg"));
}

#[tokio::test]
async fn slot_reads_only_return_requested_indexes() {
  let s = store().await;
  let key = ParticipantKey::new("spring", "p-001");

  for index in 0..3 {
    s.set_exif(&key.slot(index), &exif(json!({ "Model": format!("cam-{index}") })))
      .await
      .unwrap();
  }
  s.set_exif(&key.slot(1), &exif(json!({ "Model": "replaced" })))
    .await
    .unwrap();

  let states = s.get_all_exif_states(&key, &[1, 2, 5]).await.unwrap();
  let indexes: Vec<_> = states.iter().map(|e| e.order_index).collect();
  assert_eq!(indexes, [1, 2]);
  assert_eq!(states[0].exif.get("Model"), Some(&json!("replaced")));

  let other = ParticipantKey::new("spring", "p-002");
  assert!(s.get_all_exif_states(&other, &[0, 1, 2]).await.unwrap().is_empty());
}
