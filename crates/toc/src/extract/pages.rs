use crate::handle::DocumentHandle;
use crate::retry::RetryPolicy;
use crate::types::TextItem;
use crate::TocError;

/// Fetch a page and read its text runs, both under `policy`. The page is
/// released before returning, whether or not the read succeeded.
pub(crate) async fn read_page_text(
    doc: &dyn DocumentHandle,
    page_number: usize,
    policy: &RetryPolicy,
) -> Result<Vec<TextItem>, TocError> {
    let page = policy
        .run(&format!("page {page_number}"), || doc.page(page_number))
        .await?;
    let items = policy
        .run(&format!("text content of page {page_number}"), || {
            page.text_content()
        })
        .await;
    page.cleanup();
    items
}
