//! Classify host error messages into the conditions the resolver reacts to.

/// Conditions detected in a host error message (case-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorSignals {
    /// The filename was rejected as illegal or invalid.
    pub invalid_filename: bool,
    /// The host does not accept the private-browsing option.
    pub incognito_option: bool,
    /// The host cannot prompt for a conflict-resolution decision.
    pub prompt_unsupported: bool,
    /// The user cancelled the save.
    pub canceled: bool,
}

/// Classify a host error message.
pub fn classify(message: &str) -> ErrorSignals {
    let message = message.to_lowercase();
    ErrorSignals {
        invalid_filename: message.contains("illegal characters")
            || message.contains("invalid filename"),
        incognito_option: message.contains("'incognito'") || message.contains("\"incognito\""),
        prompt_unsupported: message.contains("conflictaction prompt not yet implemented"),
        canceled: message.contains("canceled"),
    }
}
