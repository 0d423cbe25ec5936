//! Set-Cookie line parsing.

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CookieParseError {
    #[error("no name=value pair")]
    MissingPair,
    #[error("empty cookie name")]
    EmptyName,
}

/// Value of a `Set-Cookie` header line, or None if the line is another header.
pub fn set_cookie_value(line: &str) -> Option<&str> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case("set-cookie") {
        Some(value.trim())
    } else {
        None
    }
}

/// Extract `name=value` from a Set-Cookie value, dropping attributes.
pub fn parse_set_cookie(value: &str) -> Result<(String, String), CookieParseError> {
    let pair = value.split(';').next().unwrap_or("").trim();
    let (name, value) = pair.split_once('=').ok_or(CookieParseError::MissingPair)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CookieParseError::EmptyName);
    }
    Ok((name.to_string(), value.trim().trim_matches('"').to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_line() {
        assert_eq!(
            set_cookie_value("Set-Cookie: __ddg8_=abc; Path=/"),
            Some("__ddg8_=abc; Path=/")
        );
        assert_eq!(set_cookie_value("set-cookie:x=1"), Some("x=1"));
        assert_eq!(set_cookie_value("Content-Type: text/html"), None);
        assert_eq!(set_cookie_value("HTTP/1.1 200 OK"), None);
    }

    #[test]
    fn strips_attributes() {
        let r = parse_set_cookie("__ddg9_=1.2.3.4; Domain=.example.su; Path=/; Secure").unwrap();
        assert_eq!(r, ("__ddg9_".to_string(), "1.2.3.4".to_string()));
    }

    #[test]
    fn malformed() {
        assert_eq!(parse_set_cookie("garbage"), Err(CookieParseError::MissingPair));
        assert_eq!(parse_set_cookie("=value"), Err(CookieParseError::EmptyName));
    }

    #[test]
    fn value_may_contain_equals() {
        let r = parse_set_cookie("__ddg1_=a=b==; Path=/").unwrap();
        assert_eq!(r.1, "a=b==");
    }
}
