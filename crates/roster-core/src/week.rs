//! Monday to Sunday windows and the weekly top registrar.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inclusive Monday..=Sunday calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl WeekWindow {
  /// The week containing `date`.
  pub fn containing(date: NaiveDate) -> Self {
    let back = u64::from(date.weekday().num_days_from_monday());
    // Saturates at the ends of the calendar range.
    let start = date.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    Self { start, end }
  }

  pub fn current() -> Self { Self::containing(Utc::now().date_naive()) }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    let day = at.date_naive();
    self.start <= day && day <= self.end
  }

  /// First instant of the window, in UTC.
  pub fn starts_at(&self) -> DateTime<Utc> {
    self.start.and_time(NaiveTime::MIN).and_utc()
  }

  /// First instant after the window, in UTC.
  pub fn ends_before(&self) -> DateTime<Utc> {
    self
      .end
      .succ_opt()
      .unwrap_or(NaiveDate::MAX)
      .and_time(NaiveTime::MIN)
      .and_utc()
  }
}

/// One member registration, attributed to the volunteer who made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
  pub member_id:          Uuid,
  pub registered_by:      Uuid,
  pub registered_by_name: Option<String>,
  pub organisation_id:    Option<String>,
  pub registered_at:      DateTime<Utc>,
}

/// The volunteer with the most registrations in a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyWinner {
  pub subject_id:    Uuid,
  pub display_name:  Option<String>,
  pub registrations: usize,
  pub window:        WeekWindow,
}

struct Tally<'a> {
  count: usize,
  first: DateTime<Utc>,
  name:  Option<&'a str>,
}

/// Pick the week's top registrar.
///
/// Registrations outside `window` are ignored. Ties go to whoever registered
/// first in the window, then to the smaller subject id.
pub fn weekly_winner(
  registrations: &[Registration],
  window: WeekWindow,
) -> Option<WeeklyWinner> {
  let mut tallies: HashMap<Uuid, Tally<'_>> = HashMap::new();

  for reg in registrations.iter().filter(|r| window.contains(r.registered_at)) {
    let tally = tallies.entry(reg.registered_by).or_insert(Tally {
      count: 0,
      first: reg.registered_at,
      name:  None,
    });
    tally.count += 1;
    tally.first = tally.first.min(reg.registered_at);
    if tally.name.is_none() {
      tally.name = reg.registered_by_name.as_deref();
    }
  }

  tallies
    .into_iter()
    .min_by(|(a_id, a), (b_id, b)| {
      b.count
        .cmp(&a.count)
        .then(a.first.cmp(&b.first))
        .then(a_id.cmp(b_id))
    })
    .map(|(subject_id, tally)| WeeklyWinner {
      subject_id,
      display_name: tally.name.map(str::to_owned),
      registrations: tally.count,
      window,
    })
}
