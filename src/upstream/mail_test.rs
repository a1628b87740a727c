use std::io;

use thiserror::Error;

use crate::dispatch::{ErrorKind, ToolError};
use crate::upstream::mail::{MailError, OutgoingMail, parse_mailbox, timed_out};

/// Stands in for a transport error wrapping the socket failure.
#[derive(Error, Debug)]
#[error("network error: {source}")]
struct Wrapped {
    source: io::Error,
}

fn mail(html: bool) -> OutgoingMail {
    OutgoingMail {
        from: "bot@example.com".to_string(),
        to: "Ada <ada@example.com>".to_string(),
        subject: "Weekly report".to_string(),
        body: "<p>All green</p>".to_string(),
        html,
    }
}

#[test]
fn test_parse_mailbox_accepts_display_names() {
    let mailbox = parse_mailbox(" Ada <ada@example.com> ").unwrap();
    assert_eq!(mailbox.email.to_string(), "ada@example.com");
    assert_eq!(mailbox.name.as_deref(), Some("Ada"));
}

#[test]
fn test_parse_mailbox_rejects_garbage() {
    let err = parse_mailbox("not an address").unwrap_err();
    assert!(matches!(err, MailError::InvalidAddress { .. }));
}

#[test]
fn test_message_content_type_follows_html_flag() {
    let html = String::from_utf8(mail(true).to_message().unwrap().formatted()).unwrap();
    assert!(html.contains("Content-Type: text/html"));
    assert!(html.contains("Subject: Weekly report"));

    let plain = String::from_utf8(mail(false).to_message().unwrap().formatted()).unwrap();
    assert!(plain.contains("Content-Type: text/plain"));
}

#[test]
fn test_socket_timeouts_are_classified_from_the_source_chain() {
    for kind in [io::ErrorKind::TimedOut, io::ErrorKind::WouldBlock] {
        let err = Wrapped {
            source: io::Error::new(kind, "resource temporarily unavailable"),
        };
        assert!(timed_out(&err), "{kind:?}");
        assert!(matches!(MailError::from_transport(&err), MailError::Timeout(_)));
    }

    let refused = Wrapped {
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    };
    assert!(!timed_out(&refused));
    assert!(matches!(MailError::from_transport(&refused), MailError::Smtp(_)));
}

#[test]
fn test_timeout_text_alone_is_not_a_timeout() {
    let err: ToolError = MailError::Smtp("554 relay timed out upstream".to_string()).into();
    assert_eq!(err.kind, ErrorKind::UpstreamError);

    let err: ToolError = MailError::Timeout("read".to_string()).into();
    assert_eq!(err.kind, ErrorKind::Timeout);
}
