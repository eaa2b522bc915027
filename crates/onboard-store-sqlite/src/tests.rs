//! Integration tests for `SqliteStore` against an in-memory database.

use onboard_core::{
  attendance::{Attendance, AttendanceAction},
  directory::Role,
  feed::ChangeEvent,
  normalize::{RawOnboarding, RawPatch},
  record::{NewOnboarding, RecordPatch},
  store::{OnboardingStore, RecordQuery},
  tracker::Tracker,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn input(account: &str, date: &str) -> NewOnboarding {
  NewOnboarding::new(4, "Rafael", "Acme Dental", account, date)
}

fn raw(account: &str, date: &str) -> RawOnboarding {
  RawOnboarding {
    employee_id: Some(4),
    employee_name: Some("Rafael".into()),
    client_name: Some("Acme Dental".into()),
    account_number: Some(account.into()),
    date: Some(date.into()),
    ..Default::default()
  }
}

async fn sessions(s: &SqliteStore) -> Vec<(String, String, u32)> {
  let mut out: Vec<_> = s
    .list_all_records()
    .await
    .unwrap()
    .into_iter()
    .map(|r| (r.account_number, r.date, r.session_number))
    .collect();
  out.sort();
  out
}

// ─── Create / read ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_record() {
  let s = store().await;

  let mut new = input("ACC-1", "2024-03-17");
  new.notes = Some("first call".into());
  let created = s.create_record(new).await.unwrap();
  assert_eq!(created.month, "2024-03");
  assert_eq!(created.attendance, Attendance::Pending);

  let fetched = s.get_record(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_record_returns_none() {
  let s = store().await;
  assert!(s.get_record(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_missing_fields() {
  let s = store().await;
  let err = s.create_record(input("", "2024-01-01")).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(onboard_core::Error::Validation(ref v)) if v.missing == ["account_number"]
  ));
  assert!(s.list_all_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_all_is_arrival_order() {
  let s = store().await;
  for date in ["2024-01-03", "2024-01-01", "2024-01-02"] {
    s.create_record(input("ACC-1", date)).await.unwrap();
  }
  let dates: Vec<_> = s
    .list_all_records()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.date)
    .collect();
  assert_eq!(dates, ["2024-01-03", "2024-01-01", "2024-01-02"]);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_orders_newest_first_and_filters() {
  let s = store().await;
  s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();
  s.create_record(input("ACC-2", "2024-02-01")).await.unwrap();
  s.create_record(NewOnboarding::new(9, "Jim", "Beta", "ACC-3", "2024-01-20"))
    .await
    .unwrap();

  let all = s.query(&RecordQuery::default()).await.unwrap();
  let dates: Vec<_> = all.iter().map(|r| r.date.as_str()).collect();
  assert_eq!(dates, ["2024-02-01", "2024-01-20", "2024-01-05"]);

  let january = s
    .query(&RecordQuery { month: Some("2024-01".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(january.len(), 2);

  let mine = s.list_records_by_employee(9).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].client_name, "Beta");

  let ranged = s
    .query(&RecordQuery {
      start_date: Some("2024-01-05".into()),
      end_date: Some("2024-01-20".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(ranged.len(), 2);
}

#[tokio::test]
async fn query_matches_trimmed_accounts() {
  let s = store().await;
  s.create_record(input(" ACC-1 ", "2024-01-05")).await.unwrap();
  s.create_record(input("ACC-2", "2024-01-06")).await.unwrap();

  let found = s.query(&RecordQuery::for_account("ACC-1")).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].date, "2024-01-05");
}

#[tokio::test]
async fn query_by_attendance() {
  let s = store().await;
  let a = s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();
  s.create_record(input("ACC-1", "2024-01-06")).await.unwrap();
  s.update_attendance(a.id, Attendance::Cancelled).await.unwrap();

  let cancelled = s
    .query(&RecordQuery { attendance: Some(Attendance::Cancelled), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(cancelled.len(), 1);
  assert_eq!(cancelled[0].id, a.id);
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_attendance_missing_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.update_attendance(id, Attendance::Completed).await.unwrap_err();
  assert!(matches!(err, Error::Core(onboard_core::Error::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn no_show_follow_up_lifecycle() {
  let s = store().await;
  let rec = s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();

  let err = s.mark_no_show_follow_up(rec.id, true, None).await.unwrap_err();
  assert!(matches!(err, Error::Core(onboard_core::Error::NotNoShow(_))));

  s.update_attendance(rec.id, Attendance::NoShow).await.unwrap();
  let followed = s
    .mark_no_show_follow_up(rec.id, true, Some("emailed".into()))
    .await
    .unwrap();
  let follow_up = followed.no_show.clone().unwrap();
  assert!(follow_up.reached_out);
  assert!(follow_up.reached_out_at.is_some());
  assert_eq!(s.get_record(rec.id).await.unwrap().unwrap().no_show, followed.no_show);

  // Staying no-show keeps the follow-up; leaving it clears it.
  let same = s.update_attendance(rec.id, Attendance::NoShow).await.unwrap();
  assert!(same.no_show.is_some());
  let back = s.update_attendance(rec.id, Attendance::Pending).await.unwrap();
  assert!(back.no_show.is_none());
}

#[tokio::test]
async fn update_record_rewrites_fields_and_month() {
  let s = store().await;
  let rec = s.create_record(input("ACC-1", "2024-01-31")).await.unwrap();

  let patch = RecordPatch {
    account_number: Some("ACC-2".into()),
    date: Some("2024-02-01".into()),
    notes: Some(Some("moved".into())),
    ..Default::default()
  };
  let edited = s.update_record(rec.id, patch).await.unwrap();
  assert_eq!(edited.month, "2024-02");
  assert_eq!(edited.client_name, "Acme Dental");

  let stored = s.get_record(rec.id).await.unwrap().unwrap();
  assert_eq!(stored, edited);
  assert_eq!(stored.created_at, rec.created_at);

  let err = s
    .update_record(Uuid::new_v4(), RecordPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(onboard_core::Error::NotFound(_))));
}

#[tokio::test]
async fn set_session_numbers_is_batched() {
  let s = store().await;
  let a = s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();
  let b = s.create_record(input("ACC-1", "2024-01-01")).await.unwrap();

  let touched = s
    .set_session_numbers(vec![(a.id, 2), (b.id, 1), (Uuid::new_v4(), 5)])
    .await
    .unwrap();
  assert_eq!(touched, 2);
  assert_eq!(s.get_record(a.id).await.unwrap().unwrap().session_number, 2);
}

#[tokio::test]
async fn delete_returns_the_record() {
  let s = store().await;
  let rec = s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();
  let removed = s.delete_record(rec.id).await.unwrap();
  assert_eq!(removed.id, rec.id);
  assert!(s.get_record(rec.id).await.unwrap().is_none());

  let err = s.delete_record(rec.id).await.unwrap_err();
  assert!(matches!(err, Error::Core(onboard_core::Error::NotFound(_))));
}

// ─── Bulk writes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_many_is_all_or_nothing() {
  let s = store().await;
  let err = s
    .insert_many(vec![input("ACC-1", "2024-01-01"), input("ACC-1", "")])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(onboard_core::Error::Validation(_))));
  assert!(s.list_all_records().await.unwrap().is_empty());

  let inserted = s
    .insert_many(vec![input("ACC-1", "2024-01-01"), input("ACC-2", "2024-01-02")])
    .await
    .unwrap();
  assert_eq!(inserted.len(), 2);
}

#[tokio::test]
async fn replace_all_clears_first() {
  let s = store().await;
  s.create_record(input("OLD", "2023-01-01")).await.unwrap();

  s.replace_all(vec![input("ACC-1", "2024-01-01"), input("ACC-1", "2024-01-02")])
    .await
    .unwrap();
  let all = s.list_all_records().await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().all(|r| r.account_number == "ACC-1"));
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_are_broadcast() {
  let s = store().await;
  let mut sub = s.subscribe();

  let rec = s.create_record(input("ACC-1", "2024-01-05")).await.unwrap();
  s.update_attendance(rec.id, Attendance::Rescheduled).await.unwrap();
  s.delete_record(rec.id).await.unwrap();

  assert!(matches!(sub.recv().await, Some(ChangeEvent::Inserted(r)) if r.id == rec.id));
  assert!(matches!(
    sub.recv().await,
    Some(ChangeEvent::Updated(r)) if r.attendance == Attendance::Rescheduled
  ));
  assert_eq!(sub.recv().await, Some(ChangeEvent::Deleted { id: rec.id }));
  sub.unsubscribe();
}

// ─── Tracker over SQLite ─────────────────────────────────────────────────────

#[tokio::test]
async fn tracker_numbers_out_of_order_arrivals() {
  let tracker = Tracker::new(store().await);
  for date in ["2024-01-10", "2024-01-05", "2024-01-20"] {
    tracker.log_session(raw("ACC-1", date)).await.unwrap();
  }
  tracker.log_session(raw("ACC-2", "2024-01-01")).await.unwrap();

  assert_eq!(sessions(tracker.store()).await, vec![
    ("ACC-1".into(), "2024-01-05".into(), 1),
    ("ACC-1".into(), "2024-01-10".into(), 2),
    ("ACC-1".into(), "2024-01-20".into(), 3),
    ("ACC-2".into(), "2024-01-01".into(), 1),
  ]);
}

#[tokio::test]
async fn tracker_delete_renumbers_partition() {
  let tracker = Tracker::new(store().await);
  let mut ids = Vec::new();
  for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
    ids.push(tracker.log_session(raw("ACC-1", date)).await.unwrap().record.id);
  }

  tracker.delete(ids[1]).await.unwrap();
  assert_eq!(sessions(tracker.store()).await, vec![
    ("ACC-1".into(), "2024-01-01".into(), 1),
    ("ACC-1".into(), "2024-01-03".into(), 2),
  ]);
}

#[tokio::test]
async fn tracker_approval_keeps_session_number() {
  let tracker = Tracker::new(store().await);
  tracker.log_session(raw("ACC-1", "2024-01-01")).await.unwrap();
  let rec = tracker.log_session(raw("ACC-1", "2024-01-02")).await.unwrap().record;

  tracker
    .transition(rec.id, AttendanceAction::RequestCompletion, Role::Team)
    .await
    .unwrap();
  let done = tracker
    .transition(rec.id, AttendanceAction::Approve, Role::Admin)
    .await
    .unwrap();
  assert_eq!(done.attendance, Attendance::Completed);
  assert_eq!(done.session_number, 2);
  assert_eq!(done.account_number, rec.account_number);
}

#[tokio::test]
async fn tracker_import_renumbers_touched_accounts() {
  let tracker = Tracker::new(store().await);
  let report = tracker
    .import(vec![
      raw("ACC-1", "02/01/2024"),
      raw("ACC-1", "2024-01-15"),
      RawOnboarding { client_name: None, ..raw("ACC-1", "2024-01-01") },
    ])
    .await
    .unwrap();

  assert_eq!(report.imported, 2);
  assert_eq!(report.skipped, 1);
  assert_eq!(sessions(tracker.store()).await, vec![
    ("ACC-1".into(), "2024-01-15".into(), 1),
    ("ACC-1".into(), "2024-02-01".into(), 2),
  ]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tracker_concurrent_logging_keeps_numbers_distinct() {
  let tracker = Tracker::new(store().await);
  let tasks: Vec<_> = (1..=8)
    .map(|day| {
      let tracker = tracker.clone();
      tokio::spawn(async move {
        tracker
          .log_session(raw("ACC-1", &format!("2024-01-0{day}")))
          .await
      })
    })
    .collect();
  for task in tasks {
    task.await.unwrap().unwrap();
  }

  let numbers: Vec<u32> = sessions(tracker.store())
    .await
    .into_iter()
    .map(|(_, _, n)| n)
    .collect();
  assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn tracker_edit_moves_record_between_accounts() {
  let tracker = Tracker::new(store().await);
  let mut ids = Vec::new();
  for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
    ids.push(tracker.log_session(raw("ACC-1", date)).await.unwrap().record.id);
  }
  tracker.log_session(raw("ACC-2", "2024-01-05")).await.unwrap();

  let moved = tracker
    .edit(ids[0], RawPatch { account_number: Some(" ACC-2 ".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(moved.account_number, "ACC-2");
  assert_eq!(moved.session_number, 1);

  assert_eq!(sessions(tracker.store()).await, vec![
    ("ACC-1".into(), "2024-01-02".into(), 1),
    ("ACC-1".into(), "2024-01-03".into(), 2),
    ("ACC-2".into(), "2024-01-01".into(), 1),
    ("ACC-2".into(), "2024-01-05".into(), 2),
  ]);
}

#[tokio::test]
async fn tracker_edit_redates_within_account() {
  let tracker = Tracker::new(store().await);
  let mut ids = Vec::new();
  for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
    ids.push(tracker.log_session(raw("ACC-1", date)).await.unwrap().record.id);
  }

  let redated = tracker
    .edit(ids[0], RawPatch { date: Some("02/10/2024".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(redated.date, "2024-02-10");
  assert_eq!(redated.month, "2024-02");
  assert_eq!(redated.session_number, 3);

  assert_eq!(sessions(tracker.store()).await, vec![
    ("ACC-1".into(), "2024-01-02".into(), 1),
    ("ACC-1".into(), "2024-01-03".into(), 2),
    ("ACC-1".into(), "2024-02-10".into(), 3),
  ]);

  let err = tracker.edit(ids[1], RawPatch::default()).await.unwrap_err();
  assert!(matches!(err, onboard_core::Error::EmptyPatch));
}
