//! crates/tutoring_core/src/schedule.rs
//!
//! Parsing of the free-text weekly availability strings kept in the rosters,
//! e.g. `"Monday (09:00 AM - 05:00 PM), Tuesday (04:00 PM - 06:00 PM)"`.

use chrono::{NaiveTime, Weekday};
use std::collections::HashMap;

/// Canonical weekday order used when scanning a schedule string.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const CLOCK_FORMAT: &str = "%I:%M %p";
const WEEKS_PER_MONTH: u32 = 4;

/// A start/end pair on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// 09:00-17:00, substituted for any day whose times cannot be read.
    pub fn business_hours() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses a schedule string into weekday → time slot.
///
/// A day is picked up when the literal `"<Day> ("` occurs in the text. If the
/// parenthesised range after it cannot be read, the day is still returned, mapped
/// to [`TimeSlot::business_hours`]. The map carries no ordering; use [`agenda`]
/// for a list sorted by start time.
pub fn parse_schedule(text: &str) -> HashMap<Weekday, TimeSlot> {
    let mut slots = HashMap::new();
    for day in WEEKDAYS {
        let marker = format!("{} (", day_name(day));
        let Some(found) = text.find(&marker) else {
            continue;
        };
        let rest = &text[found + marker.len()..];
        let slot = rest
            .find(')')
            .and_then(|close| parse_range(&rest[..close]))
            .unwrap_or_else(TimeSlot::business_hours);
        slots.insert(day, slot);
    }
    slots
}

fn parse_range(inner: &str) -> Option<TimeSlot> {
    let (start, end) = inner.split_once(" - ")?;
    Some(TimeSlot {
        start: parse_clock(start)?,
        end: parse_clock(end)?,
    })
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), CLOCK_FORMAT).ok()
}

/// The parsed schedule sorted by start time, then by weekday.
pub fn agenda(slots: &HashMap<Weekday, TimeSlot>) -> Vec<(Weekday, TimeSlot)> {
    let mut days: Vec<_> = slots.iter().map(|(day, slot)| (*day, *slot)).collect();
    days.sort_by_key(|(day, slot)| (slot.start, day.num_days_from_monday()));
    days
}

/// Rough number of classes per month implied by a schedule string.
///
/// This is a heuristic, not a calendar computation: every `(` counts as one weekly
/// slot; text without parentheses counts one slot per non-empty comma-separated
/// entry. The weekly count is multiplied by four.
pub fn estimate_monthly_classes(text: &str) -> u32 {
    let bracketed = text.matches('(').count();
    let weekly = if bracketed > 0 {
        bracketed
    } else {
        text.split(',').filter(|entry| !entry.trim().is_empty()).count()
    };
    u32::try_from(weekly)
        .unwrap_or(u32::MAX / WEEKS_PER_MONTH)
        .saturating_mul(WEEKS_PER_MONTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_single_day() {
        let slots = parse_schedule("Monday (09:00 AM - 05:00 PM)");
        assert_eq!(slots.len(), 1);
        assert_eq!(
            slots[&Weekday::Mon],
            TimeSlot {
                start: hm(9, 0),
                end: hm(17, 0)
            }
        );
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(parse_schedule("").is_empty());
    }

    #[test]
    fn garbled_day_falls_back_to_business_hours() {
        let slots = parse_schedule("Monday (garbled)");
        assert_eq!(slots[&Weekday::Mon], TimeSlot::business_hours());

        let unclosed = parse_schedule("Friday (10:00 AM - 11:00 AM");
        assert_eq!(unclosed[&Weekday::Fri], TimeSlot::business_hours());
    }

    #[test]
    fn parses_several_days_and_skips_absent_ones() {
        let slots = parse_schedule(
            "Tuesday (06:00 PM - 07:00 PM), Saturday (10:30 AM - 12:00 PM)",
        );
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[&Weekday::Tue].start, hm(18, 0));
        assert_eq!(slots[&Weekday::Sat].start, hm(10, 30));
        assert_eq!(slots[&Weekday::Sat].end, hm(12, 0));
        assert!(!slots.contains_key(&Weekday::Mon));
    }

    #[test]
    fn agenda_orders_by_start_time() {
        let slots = parse_schedule(
            "Monday (06:00 PM - 07:00 PM), Wednesday (08:00 AM - 09:00 AM)",
        );
        let order: Vec<_> = agenda(&slots).into_iter().map(|(day, _)| day).collect();
        assert_eq!(order, vec![Weekday::Wed, Weekday::Mon]);
    }

    #[test]
    fn estimates_from_bracketed_slots() {
        assert_eq!(
            estimate_monthly_classes(
                "Tuesday (06:00 PM - 07:00 PM), Thursday (06:00 PM - 07:00 PM)"
            ),
            8
        );
    }

    #[test]
    fn estimates_from_plain_text() {
        assert_eq!(estimate_monthly_classes("Mon evenings, Wed evenings"), 8);
        assert_eq!(estimate_monthly_classes("weekends"), 4);
        assert_eq!(estimate_monthly_classes("   "), 0);
        assert_eq!(estimate_monthly_classes(""), 0);
    }
}
