use crate::model::TimeWindow;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Créneau normalisé : `end > start`, même fuseau (heure murale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Ancre chaque créneau sur `day`. Si la fin précède (ou égale) le début,
/// elle passe au lendemain. Les créneaux invalides sont ignorés un par un,
/// l'ordre d'entrée est conservé.
pub fn normalize(windows: &[TimeWindow], day: NaiveDate) -> Vec<Slot> {
    windows
        .iter()
        .enumerate()
        .filter_map(|(pos, w)| {
            let slot = normalize_one(w, day);
            if slot.is_none() {
                tracing::debug!(position = pos, window = ?w, "skipping malformed time window");
            }
            slot
        })
        .collect()
}

fn normalize_one(window: &TimeWindow, day: NaiveDate) -> Option<Slot> {
    let start = day.and_time(parse_hhmm(window.start.as_deref()?)?);
    let mut end = day.and_time(parse_hhmm(window.end.as_deref()?)?);
    if end <= start {
        end = end.checked_add_signed(Duration::days(1))?;
    }
    Some(Slot { start, end })
}

/// `"HH:MM"` → heure ; `None` si non numérique ou hors bornes.
fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let (hh, mm) = raw.trim().split_once(':')?;
    let hh: u32 = hh.trim().parse().ok()?;
    let mm: u32 = mm.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hh, mm, 0)
}
