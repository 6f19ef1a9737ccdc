use super::{overlaps, EntryError, TimeEntry, TimeOfDay};

/// Checks a candidate interval against all entries already stored for the
/// same user and day. Returns [`EntryError::OverlapDetected`] on the first
/// collision; touching intervals pass.
pub fn check_overlap(
    start: TimeOfDay,
    end: TimeOfDay,
    same_day: &[TimeEntry],
) -> Result<(), EntryError> {
    for existing in same_day {
        if overlaps(start, end, existing.start, existing.end) {
            return Err(EntryError::OverlapDetected);
        }
    }
    Ok(())
}
