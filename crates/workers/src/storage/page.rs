use std::future::Future;

use chrono::NaiveDateTime;

use super::StoreError;

/// Keyset position of the last row of a page. Rows are ordered by
/// `(time, device_id, tiebreak)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    pub time: NaiveDateTime,
    pub device_id: String,
    pub tiebreak: String,
}

/// Fetches pages until one comes back short, feeding each page's last
/// row back in as the cursor for the next.
pub async fn collect_pages<T, C, F, Fut>(
    page_size: usize,
    cursor_of: C,
    mut fetch: F,
) -> Result<Vec<T>, StoreError>
where
    C: Fn(&T) -> ScanCursor,
    F: FnMut(Option<ScanCursor>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0u32;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;
        let full = page_size > 0 && page.len() >= page_size;
        cursor = page.last().map(&cursor_of);
        items.extend(page);
        if !full || cursor.is_none() {
            break;
        }
    }

    tracing::debug!(pages, rows = items.len(), "scan complete");
    Ok(items)
}
