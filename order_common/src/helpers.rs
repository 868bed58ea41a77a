use std::str::FromStr;

/// Parse a boolean flag from an (optional) environment value. Unrecognised values fall back to `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a numeric setting. A missing or blank value yields `default`; a value that is present but cannot be
/// parsed is an error, so that the caller can report it before falling back.
pub fn parse_number<T: FromStr>(value: Option<String>, default: T) -> Result<T, T::Err> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s.parse::<T>(),
    }
}
