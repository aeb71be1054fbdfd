//! This modules defines the common functionality for paging data.

use maud::{Markup, html};
use serde::Serialize;

/// The most items that can be requested per page.
pub const MAX_PAGE_SIZE: u64 = 100;

/// The config for pagination
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum transactions to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl PaginationConfig {
    /// The page and page size to use for a request, limiting the page size
    /// to [MAX_PAGE_SIZE].
    pub fn resolve(&self, page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
        let page = page.unwrap_or(self.default_page).max(1);
        let per_page = per_page
            .unwrap_or(self.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        (page, per_page)
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_pages: 5,
        }
    }
}

/// Where a page sits within the full list of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let pages = total.div_ceil(per_page.max(1));

        Self {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }

    /// The number of items before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= (max_pages / 2) {
        (1..=max_pages).map(map_page).collect()
    } else if curr_page > (page_count - max_pages / 2) {
        ((page_count - max_pages + 1)..=page_count)
            .map(map_page)
            .collect()
    } else {
        ((curr_page - max_pages / 2)..=(curr_page + max_pages / 2))
            .map(map_page)
            .collect()
    };

    if page_count > max_pages {
        if curr_page > (max_pages / 2) + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < (page_count - max_pages / 2) {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render `indicators` as links, where `page_url` gives the URL for a page.
pub fn pagination_nav(
    indicators: &[PaginationIndicator],
    page_url: impl Fn(u64) -> String,
) -> Markup {
    const PAGE_STYLE: &str = "px-3 py-2 rounded text-blue-600 hover:bg-gray-100 \
        dark:text-blue-500 dark:hover:bg-gray-700";
    const CURRENT_PAGE_STYLE: &str = "px-3 py-2 rounded bg-blue-600 text-white";

    html! {
        nav aria-label="Pagination" class="flex justify-center my-4"
        {
            ul class="flex items-center gap-1 text-sm"
            {
                @for indicator in indicators {
                    li {
                        @match indicator {
                            PaginationIndicator::Page(page) => {
                                a href=(page_url(*page)) class=(PAGE_STYLE) { (page) }
                            }
                            PaginationIndicator::CurrPage(page) => {
                                span aria-current="page" class=(CURRENT_PAGE_STYLE) { (page) }
                            }
                            PaginationIndicator::Ellipsis => {
                                span class="px-2" { "…" }
                            }
                            PaginationIndicator::BackButton(page) => {
                                a href=(page_url(*page)) class=(PAGE_STYLE) { "Back" }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a href=(page_url(*page)) class=(PAGE_STYLE) { "Next" }
                            }
                        }
                    }
                }
            }
        }
    }
}
