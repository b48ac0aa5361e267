//! End-to-end scenarios
//!
//! Runners drive the wired service the way concurrent request handlers
//! would; the tests below check the observable contract of the whole stack.

use std::thread;

use quill_channel::ChannelName;
use quill_core::{ArticleId, EntityStore, Principal, QuillError, QuillResult};

use crate::Harness;

/// Hammer one article's view counter from `threads` threads, each counting
/// `per_thread` views. Returns the stored total afterwards.
pub fn view_burst(
    harness: &Harness,
    article: ArticleId,
    threads: usize,
    per_thread: usize,
) -> QuillResult<u64> {
    let counters = harness.service.counters();

    thread::scope(|s| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(move || -> QuillResult<()> {
                    for _ in 0..per_thread {
                        counters.increment_views(article)?;
                    }
                    Ok(())
                })
            })
            .collect();

        for worker in workers {
            worker
                .join()
                .map_err(|_| QuillError::Store("view worker panicked".into()))??;
        }
        Ok::<(), QuillError>(())
    })?;

    Ok(harness
        .store
        .article(article)?
        .map(|a| a.views_count)
        .unwrap_or(0))
}

/// Track `count` distinct article channels for `principal`, returning each
/// accept/reject decision in order.
pub fn fill_connections(
    harness: &Harness,
    principal: &Principal,
    count: u64,
) -> QuillResult<Vec<bool>> {
    let tracker = harness.service.tracker();
    (1..=count)
        .map(|n| tracker.track(principal, &ChannelName::article(ArticleId::new(n))))
        .collect()
}
