// Player-name normalization for sheet labels.

/// A sheet label reduced to what resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    /// Surname used to look up canonical players.
    pub surname_key: String,
    /// Original text, trimmed, with internal whitespace collapsed.
    pub display_form: String,
}

/// Normalize a raw player label.
///
/// `"Last, First"` keys on the text before the first comma; otherwise the
/// last whitespace token is the surname. Suffixes such as "Jr." are not
/// recognized, so `"Ronald Acuna Jr."` keys on `"Jr."`.
///
/// Returns `None` for blank input or a comma form with nothing before the
/// comma.
pub fn normalize(raw: &str) -> Option<NormalizedName> {
    let display_form = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if display_form.is_empty() {
        return None;
    }

    let surname_key = match display_form.split_once(',') {
        Some((surname, _)) => surname.trim(),
        None => display_form.rsplit(' ').next().unwrap_or(&display_form),
    };
    if surname_key.is_empty() {
        return None;
    }

    Some(NormalizedName {
        surname_key: surname_key.to_string(),
        display_form,
    })
}
