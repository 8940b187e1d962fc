use crate::catalog::Track;

const DURATION_TOLERANCE_MS: u64 = 5000;

/// Check if two catalog entries are the same song: identical ids, or the
/// same name and primary artist (case-insensitive, surrounding whitespace
/// ignored) with durations within 5 seconds. Catches regional re-releases
/// that carry different ids, including sloppily retagged ones.
pub fn is_same_track(a: &Track, b: &Track) -> bool {
    if a.id == b.id {
        return true;
    }

    let a_name = a.name.to_lowercase();
    let b_name = b.name.to_lowercase();

    let a_artist = a
        .artists
        .first()
        .map(|artist| artist.to_lowercase())
        .unwrap_or_default();
    let b_artist = b
        .artists
        .first()
        .map(|artist| artist.to_lowercase())
        .unwrap_or_default();

    let name_match = a_name.trim() == b_name.trim();
    let artist_match = a_artist.trim() == b_artist.trim();
    let duration_match = a.duration_ms.abs_diff(b.duration_ms) < DURATION_TOLERANCE_MS;

    name_match && artist_match && duration_match
}
