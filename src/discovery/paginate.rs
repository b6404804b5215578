use std::num::NonZeroU32;

/// One page of a listing, `total_count` is the size of the whole result set as
/// reported by the provider.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

/// Fetch pages, starting from page 1, until `page_number * page_size` reaches the
/// reported total, and concatenate their items in fetch order.
///
/// The total of the latest page is trusted, so a provider changing it between
/// pages may cause under- or over-fetching. The first error aborts the drain
/// and everything fetched so far is dropped.
pub async fn paginate<T, E, F>(page_size: NonZeroU32, mut fetch: F) -> Result<Vec<T>, E>
where
    F: AsyncFnMut(u32, u32) -> Result<Page<T>, E>,
{
    let page_size = page_size.get();
    let mut page_number = 1;
    let mut items = Vec::new();

    loop {
        let page = fetch(page_number, page_size).await?;
        items.extend(page.items);

        if u64::from(page_number) * u64::from(page_size) >= page.total_count {
            break;
        }

        page_number += 1;
    }

    Ok(items)
}
