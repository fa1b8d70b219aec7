//! Bookable interview slots per interviewer across a fixed window of days.
//!
//! Each day runs from `day_start` while a whole slot still fits before `day_end`.
//! A slot may not start inside `[lunch_start, lunch_end)`; the cursor jumps to the
//! end of lunch instead. After every `break_every` slots generated on a day the cursor
//! advances by `break_minutes`. Slots matching a persisted booking still count toward
//! the break rhythm, so regenerated calendars line up with recorded start times.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Interviewer, InterviewerId, Slot, TakenSlot};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Working-hour, lunch, and break rules for slot generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub window_start: NaiveDate,
    pub window_days: u32,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub slot_minutes: u32,
    pub break_minutes: u32,
    pub break_every: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            window_start: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default(),
            window_days: 5,
            day_start: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            lunch_start: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
            lunch_end: NaiveTime::from_hms_opt(13, 30, 0).unwrap_or_default(),
            slot_minutes: 30,
            break_minutes: 2,
            break_every: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarConfigError {
    #[error("calendar window must cover at least one day")]
    EmptyWindow,
    #[error("slot length must be positive")]
    ZeroSlotLength,
    #[error("working day must end after it starts")]
    InvertedDay,
    #[error("lunch window must end after it starts and fall inside the working day")]
    LunchOutsideDay,
    #[error("slot length of {0} minutes exceeds the working day")]
    SlotLongerThanDay(u32),
    #[error("break length of {0} minutes exceeds the working day")]
    BreakLongerThanDay(u32),
}

impl CalendarConfig {
    pub fn validate(&self) -> Result<(), CalendarConfigError> {
        if self.window_days == 0 {
            return Err(CalendarConfigError::EmptyWindow);
        }
        if self.slot_minutes == 0 {
            return Err(CalendarConfigError::ZeroSlotLength);
        }
        if self.day_end <= self.day_start {
            return Err(CalendarConfigError::InvertedDay);
        }
        if self.lunch_end < self.lunch_start
            || self.lunch_start < self.day_start
            || self.lunch_end > self.day_end
        {
            return Err(CalendarConfigError::LunchOutsideDay);
        }
        let day_length = minutes(self.day_end) - minutes(self.day_start);
        if self.slot_minutes > day_length {
            return Err(CalendarConfigError::SlotLongerThanDay(self.slot_minutes));
        }
        if self.break_minutes > day_length {
            return Err(CalendarConfigError::BreakLongerThanDay(self.break_minutes));
        }
        Ok(())
    }

    pub fn window_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.window_days)
            .filter_map(move |offset| {
                self.window_start
                    .checked_add_signed(Duration::days(offset.into()))
            })
    }

    /// Every slot position for one interviewer on one day, before consumed slots are removed.
    pub fn day_slots(&self, interviewer_id: &InterviewerId, date: NaiveDate) -> Vec<Slot> {
        let day_start = minutes(self.day_start);
        let day_end = minutes(self.day_end);
        let lunch_start = minutes(self.lunch_start);
        let lunch_end = minutes(self.lunch_end);
        let in_lunch = |cursor: u32| cursor >= lunch_start && cursor < lunch_end;

        let mut slots = Vec::new();
        if self.slot_minutes == 0 {
            return slots;
        }

        let mut cursor = day_start;
        let mut produced: u32 = 0;
        loop {
            if in_lunch(cursor) {
                cursor = lunch_end;
            }
            if produced > 0 && self.break_every > 0 && produced % self.break_every == 0 {
                let Some(resumed) = cursor.checked_add(self.break_minutes) else {
                    break;
                };
                cursor = resumed;
                if in_lunch(cursor) {
                    cursor = lunch_end;
                }
            }
            let Some(end) = cursor.checked_add(self.slot_minutes) else {
                break;
            };
            if end > day_end {
                break;
            }

            let (Some(start_time), Some(end_time)) = (time_of(cursor), time_of(end)) else {
                break;
            };
            slots.push(Slot {
                interviewer_id: interviewer_id.clone(),
                date,
                start: start_time,
                end: end_time,
            });
            cursor = end;
            produced += 1;
        }
        slots
    }
}

fn minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Available slots per interviewer, ordered by date then start time.
///
/// `pop_earliest` is the only mutator; a popped slot is never offered again by the
/// same instance.
#[derive(Debug, Clone, Default)]
pub struct SlotCalendar {
    available: BTreeMap<InterviewerId, VecDeque<Slot>>,
}

impl SlotCalendar {
    pub fn new(
        config: &CalendarConfig,
        interviewers: &[Interviewer],
        taken: &HashSet<TakenSlot>,
    ) -> Self {
        let mut available = BTreeMap::new();
        for interviewer in interviewers {
            let queue: VecDeque<Slot> = config
                .window_dates()
                .flat_map(|date| config.day_slots(&interviewer.id, date))
                .filter(|slot| !taken.contains(&slot.key()))
                .collect();
            available.insert(interviewer.id.clone(), queue);
        }

        let calendar = Self { available };
        info!(
            available_slots = calendar.total_available(),
            interviewers = calendar.available.len(),
            excluded = taken.len(),
            "slot calendar initialized"
        );
        calendar
    }

    /// Removes and returns the earliest remaining slot, or `None` when exhausted or unknown.
    pub fn pop_earliest(&mut self, interviewer_id: &InterviewerId) -> Option<Slot> {
        self.available.get_mut(interviewer_id)?.pop_front()
    }

    pub fn peek_earliest(&self, interviewer_id: &InterviewerId) -> Option<&Slot> {
        self.available.get(interviewer_id)?.front()
    }

    pub fn available(&self, interviewer_id: &InterviewerId) -> impl Iterator<Item = &Slot> {
        self.available
            .get(interviewer_id)
            .into_iter()
            .flat_map(|queue| queue.iter())
    }

    pub fn remaining(&self, interviewer_id: &InterviewerId) -> usize {
        self.available
            .get(interviewer_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    pub fn total_available(&self) -> usize {
        self.available.values().map(VecDeque::len).sum()
    }
}
