//! Transport-level sanitizer, the authoritative backstop.
//!
//! Every resolved recipient across to, cc and bcc goes through the same
//! predicate.  The first failure blanks the whole message.

use crate::allow_list::AllowListPredicate;
use crate::filter::{decide, extract_address, Decision};
use crate::message::TransportMessage;

/// Check every recipient and clear recipients, attachments, custom headers
/// and reply-to addresses on the first disallowed one.  Returns the decision
/// that was applied; an allowed message is left untouched.
pub fn sanitize(msg: &mut TransportMessage, predicate: &AllowListPredicate) -> Decision {
    let decision = decide(
        msg.recipients().map(|m| extract_address(&m.address)),
        predicate,
    );
    if !decision.allowed {
        tracing::warn!(
            hook = "transport",
            offending = ?decision.offending,
            recipients = msg.recipient_count(),
            attachments = msg.attachments.len(),
            "blocking message with external recipient"
        );
        msg.clear_all();
    } else {
        tracing::debug!(hook = "transport", recipients = msg.recipient_count(), "message allowed");
    }
    decision
}
