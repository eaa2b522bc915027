//! Session numbering engine.
//!
//! A record's session number is its 1-based chronological rank among every
//! record that shares its trimmed account number. All write paths (single
//! insert, bulk import, delete, export) derive numbers here and nowhere else.
//!
//! Ordering within a partition:
//! - well-formed ISO dates in calendar order,
//! - then every record whose date cannot be parsed,
//! - ties keep their input order (callers pass records in arrival order), and
//!   a newly inserted record lands after existing records with the same date.
//!
//! Nothing in this module fails on bad data and nothing mutates its input
//! unless the signature says so.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  normalize::parse_iso_date,
  record::{NewOnboarding, OnboardingRecord},
};

// ─── Sessioned ───────────────────────────────────────────────────────────────

/// Anything that can be numbered: it has an account, a date and a slot for
/// the resulting session number.
pub trait Sessioned {
  fn account_number(&self) -> &str;
  fn date(&self) -> &str;
  fn session_number(&self) -> u32;
  fn set_session_number(&mut self, number: u32);
}

impl Sessioned for OnboardingRecord {
  fn account_number(&self) -> &str { &self.account_number }

  fn date(&self) -> &str { &self.date }

  fn session_number(&self) -> u32 { self.session_number }

  fn set_session_number(&mut self, number: u32) { self.session_number = number; }
}

impl Sessioned for NewOnboarding {
  fn account_number(&self) -> &str { &self.account_number }

  fn date(&self) -> &str { &self.date }

  fn session_number(&self) -> u32 { self.session_number }

  fn set_session_number(&mut self, number: u32) { self.session_number = number; }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The partition key for an account number. Missing and blank accounts all
/// share the empty key, so they are numbered together.
pub fn normalize_account_key(account: Option<&str>) -> &str {
  account.map(str::trim).unwrap_or("")
}

fn partition_key<R: Sessioned + ?Sized>(record: &R) -> &str {
  normalize_account_key(Some(record.account_number()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ChronoKey {
  Dated(NaiveDate),
  Undated,
}

fn chrono_key(date: &str) -> ChronoKey {
  parse_iso_date(date).map_or(ChronoKey::Undated, ChronoKey::Dated)
}

fn to_rank(position: usize) -> u32 {
  u32::try_from(position + 1).unwrap_or(u32::MAX)
}

// ─── Partitioning ────────────────────────────────────────────────────────────

/// Group indices into `records` by partition (in order of first appearance)
/// and sort each group chronologically. The sort is stable.
fn partitions<R: Sessioned>(records: &[R]) -> Vec<Vec<usize>> {
  let mut slots: HashMap<&str, usize> = HashMap::new();
  let mut groups: Vec<Vec<usize>> = Vec::new();

  for (i, record) in records.iter().enumerate() {
    let slot = *slots.entry(partition_key(record)).or_insert_with(|| {
      groups.push(Vec::new());
      groups.len() - 1
    });
    groups[slot].push(i);
  }

  for group in &mut groups {
    group.sort_by_key(|&i| chrono_key(records[i].date()));
  }
  groups
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// The session number `candidate` should get if it joined `existing`.
///
/// Counts the same-partition records that sort at or before the candidate's
/// date, so a candidate sharing a date with existing records is placed after
/// them. `existing` may contain any accounts; it is only read.
pub fn insertion_session_number<R, N>(existing: &[R], candidate: &N) -> u32
where
  R: Sessioned,
  N: Sessioned + ?Sized,
{
  let key = partition_key(candidate);
  let at = chrono_key(candidate.date());
  let before = existing
    .iter()
    .filter(|r| partition_key(*r) == key && chrono_key(r.date()) <= at)
    .count();
  to_rank(before)
}

/// Make room for `candidate` in `records`: every same-partition record that
/// sorts strictly after it moves up by one. Returns the candidate's number.
///
/// Assumes `records` already satisfies the numbering invariant; run
/// [`renumber_in_place`] first if that is in doubt.
pub fn reserve_session_number<R, N>(records: &mut [R], candidate: &N) -> u32
where
  R: Sessioned,
  N: Sessioned + ?Sized,
{
  let number = insertion_session_number(records, candidate);
  let key = partition_key(candidate).to_owned();
  let at = chrono_key(candidate.date());

  for record in records.iter_mut() {
    if partition_key(record) == key && chrono_key(record.date()) > at {
      let bumped = record.session_number().saturating_add(1);
      record.set_session_number(bumped);
    }
  }
  number
}

/// The correct session number for each record, by input index.
pub fn session_numbers<R: Sessioned>(records: &[R]) -> Vec<u32> {
  let mut numbers = vec![0; records.len()];
  for group in partitions(records) {
    for (position, i) in group.into_iter().enumerate() {
      numbers[i] = to_rank(position);
    }
  }
  numbers
}

/// Rewrite every record's session number without reordering. Returns how
/// many numbers changed.
pub fn renumber_in_place<R: Sessioned>(records: &mut [R]) -> usize {
  let numbers = session_numbers(records);
  let mut changed = 0;
  for (record, number) in records.iter_mut().zip(numbers) {
    if record.session_number() != number {
      record.set_session_number(number);
      changed += 1;
    }
  }
  changed
}

/// Re-derive every session number from scratch.
///
/// The output keeps partitions in order of first appearance, and lists each
/// partition in session order, so it can be bulk-written as-is when row
/// order doubles as session order. Idempotent.
pub fn recompute_all_session_numbers<R: Sessioned>(records: Vec<R>) -> Vec<R> {
  let groups = partitions(&records);
  let total = records.len();
  let mut slots: Vec<Option<R>> = records.into_iter().map(Some).collect();
  let mut out = Vec::with_capacity(total);

  for group in &groups {
    for (position, &i) in group.iter().enumerate() {
      if let Some(mut record) = slots[i].take() {
        record.set_session_number(to_rank(position));
        out.push(record);
      }
    }
  }

  tracing::debug!(
    records = total,
    partitions = groups.len(),
    "recomputed session numbers"
  );
  out
}

/// `(id, correct number)` for every stored record whose cached number is
/// wrong. Feed the result to
/// [`OnboardingStore::set_session_numbers`](crate::store::OnboardingStore::set_session_numbers).
pub fn renumbering(records: &[OnboardingRecord]) -> Vec<(Uuid, u32)> {
  records
    .iter()
    .zip(session_numbers(records))
    .filter(|(record, number)| record.session_number != *number)
    .map(|(record, number)| (record.id, number))
    .collect()
}
