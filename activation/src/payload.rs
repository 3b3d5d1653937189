use crate::Arguments;

/// Launch argument appended by the activation entry-point registration.
///
/// A launch carrying exactly this token was started by the external
/// trigger system; the activation itself arrives through the registered
/// entry point, so the dispatcher treats the token as a no-op instead of
/// dispatching the launch a second time.
pub const NOTIFICATION_LAUNCH_ARG: &str = "-NotificationActivated";

/// Returns true if the raw payload is the external-trigger launch token.
pub fn is_launch_marker(raw_payload: &str) -> bool {
    raw_payload.trim() == NOTIFICATION_LAUNCH_ARG
}

/// Parses a query-string shaped payload (`key1=value1&key2=value2`,
/// percent-encoded, `+` as space) into an [`Arguments`] map.
///
/// Parsing never fails: a fragment without `=`, with an invalid percent
/// escape, or with a non-UTF-8 decoded value is dropped and logged, the
/// rest of the payload is kept.
pub fn parse_arguments(raw_payload: &str) -> Arguments {
    let mut args = Arguments::new();
    for fragment in raw_payload.split('&') {
        if fragment.is_empty() {
            continue;
        }
        let Some((raw_key, raw_value)) = fragment.split_once('=') else {
            log::warn!("Dropping payload fragment without '=': {:?}", fragment);
            continue;
        };
        match (percent_decode(raw_key), percent_decode(raw_value)) {
            (Some(key), Some(value)) if !key.is_empty() => {
                args.insert(key, value);
            }
            _ => {
                log::warn!("Dropping undecodable payload fragment: {:?}", fragment);
            }
        }
    }
    args
}

fn percent_decode(input: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(input.len());
    let mut rest = input.bytes();
    while let Some(byte) = rest.next() {
        match byte {
            b'%' => {
                let hi = hex_value(rest.next()?)?;
                let lo = hex_value(rest.next()?)?;
                bytes.push(hi << 4 | lo);
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(byte),
        }
    }
    String::from_utf8(bytes).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_payload() {
        let args = parse_arguments("action=viewConversation&conversationId=5");
        assert_eq!(args.get("action"), Some("viewConversation"));
        assert_eq!(args.get("conversationId"), Some("5"));
    }

    #[test]
    fn parse_decodes_percent_and_plus() {
        let args = parse_arguments("msg=hello+world%21&imageUrl=https%3A%2F%2Fexample.com%2Fa.png");
        assert_eq!(args.get("msg"), Some("hello world!"));
        assert_eq!(args.get("imageUrl"), Some("https://example.com/a.png"));
    }

    #[test]
    fn malformed_fragments_are_dropped_not_fatal() {
        let args = parse_arguments("???&action=like&bad%zz=1&=empty");
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("action"), Some("like"));
    }

    #[test]
    fn round_trip_preserves_arguments() {
        let mut args = Arguments::new();
        args.insert("action", "viewImage");
        args.insert("imageUrl", "https://example.com/a b.png");
        args.insert("note", "100% sure & done");
        assert_eq!(parse_arguments(&args.serialize()), args);
    }

    #[test]
    fn launch_marker_is_recognized() {
        assert!(is_launch_marker("-NotificationActivated"));
        assert!(is_launch_marker("  -NotificationActivated "));
        assert!(!is_launch_marker("action=viewImage"));
    }
}
