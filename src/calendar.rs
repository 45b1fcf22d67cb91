// src/calendar.rs

/// The twelve Jalali month names, spelled exactly as the CBI monthly tables
/// print them, paired with their ordinals.
static JALALI_MONTHS: &[(&str, u32)] = &[
    ("فروردين", 1),
    ("ارديبهشت", 2),
    ("خرداد", 3),
    ("تير", 4),
    ("مرداد", 5),
    ("شهريور", 6),
    ("مهر", 7),
    ("آبان", 8),
    ("آذر", 9),
    ("دی", 10),
    ("بهمن", 11),
    ("اسفند", 12),
];

/// Map a Jalali month name to its ordinal (1–12). Unknown names map to
/// `None`; callers decide how hard to fail.
pub fn month_ordinal(name: &str) -> Option<u32> {
    let name = name.trim();
    JALALI_MONTHS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, ordinal)| ordinal)
}
