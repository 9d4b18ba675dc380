//! OData collection paging shared by Graph and Defender list endpoints.
//!
//! Both APIs wrap collections in `{ "value": [...] }` and, when more
//! results exist, add an absolute `@odata.nextLink` URL. The link is opaque
//! and is followed verbatim until a page arrives without one.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::client::ApiClient;
use crate::error::Result;

/// One page of an OData collection.
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
    /// Items on this page.
    pub value: Vec<T>,

    /// Absolute URL of the next page; absent on the last page.
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Fetches `first_path` and every continuation page after it, returning
/// all items in server order.
///
/// Any failing page aborts the whole fetch; items gathered from earlier
/// pages are dropped with the error. No deduplication is performed.
pub async fn collect_pages<T: DeserializeOwned>(
    client: &ApiClient,
    first_path: &str,
) -> Result<Vec<T>> {
    let mut page: ODataPage<T> = client.get(first_path).await?;
    let mut items = Vec::new();
    let mut pages = 1usize;

    loop {
        tracing::debug!(path = first_path, page = pages, items = page.value.len(), "received page");
        items.extend(page.value);

        match page.next_link {
            Some(link) => {
                page = client.get_url(&link).await?;
                pages += 1;
            }
            None => break,
        }
    }

    Ok(items)
}
