//! Offset paging over `getPolls(offset, limit)`.

use chainvote_types::Poll;

use crate::{LedgerError, PollLedger};

/// Page size when none is configured.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest page requested in one call.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Clamp a requested page size to [1, MAX_PAGE_SIZE].
pub fn effective_page_size(requested: u64) -> u64 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Offset of the next page, or `None` when fewer items than `page_size`
/// came back (the last page).
pub fn next_offset(current_offset: u64, returned: usize, page_size: u64) -> Option<u64> {
    let returned = returned as u64;
    if returned < page_size {
        None
    } else {
        Some(current_offset + returned)
    }
}

/// Read every poll page by page, up to the contract's `pollCount`.
///
/// The count bounds the walk, so a node that keeps answering with full pages
/// cannot keep it going. Pages longer than requested are truncated.
pub async fn fetch_all(ledger: &dyn PollLedger, page_size: u64) -> Result<Vec<Poll>, LedgerError> {
    let page_size = effective_page_size(page_size);
    let total = ledger.poll_count().await?;
    let mut polls = Vec::new();
    let mut offset = 0;
    while offset < total {
        let limit = page_size.min(total - offset);
        let mut page = ledger.polls(offset, limit).await?;
        page.truncate(limit as usize);
        tracing::debug!(offset, returned = page.len(), total, "fetched poll page");
        let next = next_offset(offset, page.len(), limit);
        polls.extend(page);
        match next {
            Some(n) => offset = n,
            None => break,
        }
    }
    Ok(polls)
}
