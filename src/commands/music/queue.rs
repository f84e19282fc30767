use super::*;
use crate::commands::music::utils::guards;

/// Tracks shown per queue page
pub const QUEUE_PAGE_SIZE: usize = 10;

/// Resolve the requested 1-based page, or the page count when it is out of range
fn select_page(raw: Option<&str>, track_count: usize) -> Result<usize, usize> {
    let total_pages = track_count.div_ceil(QUEUE_PAGE_SIZE).max(1);
    let page = match raw {
        None => 1,
        Some(raw) => raw.parse::<usize>().map_err(|_| total_pages)?,
    };

    if (1..=total_pages).contains(&page) {
        Ok(page)
    } else {
        Err(total_pages)
    }
}

/// Show one page of the queue
pub async fn queue(cx: &CommandContext<'_>, page: Option<&str>) -> CommandReply {
    let session = guards::require_session(cx, "queue").await?;
    let page = select_page(page, session.len()).map_err(embedded_messages::invalid_page)?;

    Ok(Some(embedded_messages::queue_page(
        &session.tracks,
        page,
        QUEUE_PAGE_SIZE,
    )))
}
