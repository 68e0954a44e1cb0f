/// Parses a `KEY=VALUE` device-attribute flag into a pair. Used for
/// `--device-attribute`, which may be passed multiple times to build the
/// map sent during `identify`.
///
/// # Errors
///
/// Returns an error string (clap renders this as the flag's parse failure)
/// when the value has no `=` separator or an empty key.
pub fn parse_device_attribute(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("device attribute key is empty in '{}'", raw));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value() {
        assert_eq!(
            parse_device_attribute("hw_version=2"),
            Ok(("hw_version".to_owned(), "2".to_owned()))
        );
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_device_attribute("hw_version").is_err());
    }

    #[test]
    fn rejects_empty_key() {
        assert!(parse_device_attribute("=2").is_err());
    }

    #[test]
    fn allows_value_with_equals() {
        assert_eq!(
            parse_device_attribute("build=a=b"),
            Ok(("build".to_owned(), "a=b".to_owned()))
        );
    }
}
