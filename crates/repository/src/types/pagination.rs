//! Page requests, page results and pagination arithmetic.

use crate::error::PagingError;

use super::filter::Filter;
use super::sort::SortRule;

/// Number of items skipped before page `page_number` (1-based).
pub fn compute_offset(page_number: u32, page_size: u32) -> u64 {
    u64::from(page_number.saturating_sub(1)) * u64::from(page_size)
}

/// Number of pages needed for `total_item_count` items.
///
/// Zero items means zero pages. A page size of zero also yields zero.
pub fn compute_total_pages(total_item_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_item_count.div_ceil(u64::from(page_size))
}

/// A request for one page of a filtered, sorted result set.
#[derive(Debug, Clone)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
    filter: Filter,
    sort: Vec<SortRule>,
}

impl PageRequest {
    /// Creates a request with no filter and no sort rules.
    ///
    /// Both `page_number` and `page_size` must be at least 1.
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, PagingError> {
        if page_number == 0 {
            return Err(PagingError::InvalidPageNumber { value: page_number });
        }
        if page_size == 0 {
            return Err(PagingError::InvalidPageSize { value: page_size });
        }
        Ok(Self {
            page_number,
            page_size,
            filter: Filter::Empty,
            sort: Vec::new(),
        })
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort rules.
    pub fn with_sort(mut self, sort: Vec<SortRule>) -> Self {
        self.sort = sort;
        self
    }

    /// Appends a sort rule.
    pub fn then_by(mut self, rule: SortRule) -> Self {
        self.sort.push(rule);
        self
    }

    /// 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Maximum number of items per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The filter applied before counting.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The sort rules applied after counting.
    pub fn sort(&self) -> &[SortRule] {
        &self.sort
    }

    /// `(page_number - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        compute_offset(self.page_number, self.page_size)
    }
}

/// One page of results together with the size of the full filtered set.
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    request: PageRequest,
    total_item_count: u64,
    items: Vec<T>,
}

impl<T> PageResult<T> {
    /// Assembles a page result.
    pub fn new(request: PageRequest, total_item_count: u64, items: Vec<T>) -> Self {
        debug_assert!(items.len() <= request.page_size() as usize);
        Self {
            request,
            total_item_count,
            items,
        }
    }

    /// The request this page answers.
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Number of items matching the filter, across all pages.
    pub fn total_item_count(&self) -> u64 {
        self.total_item_count
    }

    /// Items on this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of pages at this request's page size.
    pub fn total_pages(&self) -> u64 {
        compute_total_pages(self.total_item_count, self.request.page_size)
    }

    /// Returns true if a later page exists.
    pub fn has_next_page(&self) -> bool {
        u64::from(self.request.page_number) < self.total_pages()
    }

    /// Returns true if an earlier page exists.
    pub fn has_previous_page(&self) -> bool {
        self.request.page_number > 1
    }

    /// Transforms the items, keeping the paging metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PageResult<U> {
        PageResult {
            request: self.request,
            total_item_count: self.total_item_count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(compute_offset(1, 10), 0);
        assert_eq!(compute_offset(3, 25), 50);
        assert_eq!(PageRequest::new(4, 5).unwrap().offset(), 15);
    }

    #[test]
    fn test_total_pages_edge_cases() {
        assert_eq!(compute_total_pages(0, 10), 0);
        assert_eq!(compute_total_pages(1, 10), 1);
        assert_eq!(compute_total_pages(10, 10), 1);
        assert_eq!(compute_total_pages(11, 10), 2);
        assert_eq!(compute_total_pages(5, 0), 0);
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            PageRequest::new(0, 10).unwrap_err(),
            PagingError::InvalidPageNumber { value: 0 }
        );
        assert_eq!(
            PageRequest::new(1, 0).unwrap_err(),
            PagingError::InvalidPageSize { value: 0 }
        );
    }

    #[test]
    fn test_page_navigation() {
        let request = PageRequest::new(2, 10).unwrap();
        let page = PageResult::new(request, 25, vec![0; 10]);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next_page());
        assert!(page.has_previous_page());

        let last = PageResult::new(PageRequest::new(3, 10).unwrap(), 25, vec![0; 5]);
        assert!(!last.has_next_page());
    }

    #[test]
    fn test_page_beyond_end_keeps_totals() {
        let page: PageResult<u8> = PageResult::new(PageRequest::new(11, 10).unwrap(), 100, vec![]);
        assert!(page.is_empty());
        assert_eq!(page.total_item_count(), 100);
        assert_eq!(page.total_pages(), 10);
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = PageResult::new(PageRequest::new(1, 3).unwrap(), 7, vec![1, 2, 3]);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items(), &[10, 20, 30]);
        assert_eq!(mapped.total_item_count(), 7);
        assert_eq!(mapped.total_pages(), 3);
    }

    proptest! {
        #[test]
        fn test_total_pages_is_ceiling(total in 0u64..1_000_000, size in 1u32..1_000) {
            let pages = compute_total_pages(total, size);
            let size = u64::from(size);
            prop_assert_eq!(pages == 0, total == 0);
            prop_assert!(pages * size >= total);
            if pages > 0 {
                prop_assert!((pages - 1) * size < total);
            }
        }

        #[test]
        fn test_offset_matches_formula(number in 1u32..10_000, size in 1u32..10_000) {
            prop_assert_eq!(
                compute_offset(number, size),
                (u64::from(number) - 1) * u64::from(size)
            );
        }
    }
}
