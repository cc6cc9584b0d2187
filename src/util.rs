use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::state::request_id::RequestIdGenerator;

static COMPLETION_IDS: LazyLock<RequestIdGenerator> = LazyLock::new(RequestIdGenerator::new);

#[inline]
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Fresh `chatcmpl-<uuid>` id for responses whose provider supplies none.
pub(crate) fn next_completion_id() -> String {
    let uuid = COMPLETION_IDS.request_uuid(COMPLETION_IDS.next_seq());
    format!("chatcmpl-{}", uuid.simple())
}
