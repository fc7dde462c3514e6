//! XP curve: `threshold(level) = 100 * level * (level + 1) / 2`.

/// Total XP needed to finish `level`.
///
/// Exact in integers since `level * (level + 1)` is always even. Saturates at
/// `u64::MAX` for absurd levels.
pub fn xp_threshold_for_level(level: u32) -> u64 {
    checked_threshold(level).unwrap_or(u64::MAX)
}

fn checked_threshold(level: u32) -> Option<u64> {
    let l = level as u64;
    l.checked_mul(l + 1)?.checked_mul(50)
}

/// XP still missing before `level` is complete. Never negative.
pub fn xp_to_next_level(level: u32, current_xp: u64) -> u64 {
    xp_threshold_for_level(level).saturating_sub(current_xp)
}

/// Level a character with `xp` total experience is at. Levels start at 1.
///
/// Level `L` covers `[threshold(L - 1), threshold(L))`.
pub fn level_for_xp(xp: u64) -> u32 {
    // Invert the quadratic, then correct for float rounding.
    let estimate = ((1.0 + xp as f64 / 12.5).sqrt() - 1.0) / 2.0;
    let mut completed = estimate.max(0.0).min(u32::MAX as f64 - 1.0) as u32;
    while completed > 0 && checked_threshold(completed).is_none_or(|t| t > xp) {
        completed -= 1;
    }
    while matches!(checked_threshold(completed + 1), Some(t) if t <= xp) {
        completed += 1;
    }
    completed + 1
}
