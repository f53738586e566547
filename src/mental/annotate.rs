//! Exceptional-day annotation

use crate::mental::definitions::ExceptionalDay;
use crate::types::MoodLog;

/// Factor overridden by an exceptional day
pub const ELEVATED_FACTOR: &str = "elevated";

/// Set `elevated` on every entry whose note contains an exceptional-day
/// pattern (case-sensitive, applied in order so later patterns win).
///
/// Returns the number of overrides applied.
pub fn annotate_exceptional_days(log: &mut MoodLog, days: &[ExceptionalDay]) -> usize {
    if days.is_empty() {
        return 0;
    }
    log.add_factor(ELEVATED_FACTOR);

    let mut applied = 0;
    for day in days {
        for entry in log
            .entries
            .iter_mut()
            .filter(|e| e.note.contains(day.pattern.as_str()))
        {
            entry.set_factor(ELEVATED_FACTOR, Some(day.score));
            applied += 1;
        }
    }
    applied
}
