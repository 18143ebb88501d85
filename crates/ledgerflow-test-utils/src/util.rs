//! Async helpers for tests.

use std::time::Duration;

/// Poll `condition` until it holds, panicking after `limit`
pub async fn eventually(limit: Duration, condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met within {:?}", limit);
}
