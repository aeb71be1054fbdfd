//! The navigation bar shown at the top of every page, and at the bottom on small screens.

use maud::{Markup, html};

use crate::{endpoints, html::exchange_rate_ticker};

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    /// Short label for the bottom bar on small screens.
    icon: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_desktop_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }

    fn into_mobile_html(self) -> Markup {
        let style = if self.is_current {
            "flex flex-col items-center rounded-lg py-1 text-blue-700 bg-blue-50
            dark:bg-blue-900/30 dark:text-blue-200"
        } else {
            "flex flex-col items-center rounded-lg py-1 text-gray-600
            hover:text-blue-700 dark:text-gray-300"
        };

        html!(
            a
                href=(self.url)
                class=(style)
                aria-current=[self.is_current.then_some("page")]
            {
                span aria-hidden="true" { (self.icon) }
                span class="truncate text-[11px]" { (self.title) }
            }
        )
    }
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let links = [
            (endpoints::DASHBOARD_VIEW, "Dashboard", "🏠"),
            (endpoints::TRANSACTIONS_VIEW, "Transactions", "📋"),
            (endpoints::INCOME_VIEW, "Income", "💰"),
            (endpoints::EXPENSES_VIEW, "Expenses", "💸"),
            (endpoints::REPORTS_VIEW, "Reports", "📊"),
            (endpoints::SETTINGS_VIEW, "Settings", "⚙️"),
        ]
        .into_iter()
        .map(|(url, title, icon)| Link {
            url,
            title,
            icon,
            is_current: active_endpoint == url,
        })
        .collect();

        NavBar { links }
    }

    pub fn into_html(self) -> Markup {
        let links = self.links;

        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::DASHBOARD_VIEW)
                        class="flex items-center space-x-3"
                    {
                        img
                            src="/static/favicon-128x128.png"
                            alt="Expensa Logo"
                            class="h-8"
                        ;

                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Expensa"
                        }
                    }

                    (exchange_rate_ticker())

                    div class="hidden lg:flex lg:items-center lg:gap-8"
                    {
                        ul class="font-medium flex flex-row gap-8"
                        {
                            @for link in links.clone() {
                                li { (link.into_desktop_html()) }
                            }
                        }

                        div class="flex gap-2 text-sm"
                        {
                            a
                                href=(endpoints::NEW_INCOME_VIEW)
                                class="px-3 py-1 rounded bg-green-600 text-white hover:bg-green-700"
                            {
                                "+ Income"
                            }
                            a
                                href=(endpoints::NEW_EXPENSE_VIEW)
                                class="px-3 py-1 rounded bg-red-600 text-white hover:bg-red-700"
                            {
                                "+ Expense"
                            }
                        }
                    }
                }
            }

            nav class="fixed inset-x-0 bottom-0 z-40 lg:hidden"
            {
                ul
                    class="grid grid-cols-6 gap-1 mx-4 mb-4 p-2 rounded-xl border border-gray-200
                    bg-white/95 shadow-lg dark:border-gray-700 dark:bg-gray-900/95"
                    aria-label="Primary"
                {
                    @for link in links {
                        li class="min-w-0" { (link.into_mobile_html()) }
                    }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use std::collections::HashMap;

    use crate::{endpoints, navigation::NavBar};

    #[test]
    fn set_active_endpoint() {
        let mut cases = HashMap::new();
        cases.insert(endpoints::DASHBOARD_VIEW, true);
        cases.insert(endpoints::TRANSACTIONS_VIEW, true);
        cases.insert(endpoints::REPORTS_VIEW, true);
        cases.insert(endpoints::INCOME_VIEW, true);
        cases.insert(endpoints::EXPENSES_VIEW, true);
        cases.insert(endpoints::SETTINGS_VIEW, true);

        cases.insert(endpoints::ROOT, false);
        cases.insert(endpoints::NEW_EXPENSE_VIEW, false);
        cases.insert(endpoints::INTERNAL_ERROR_VIEW, false);
        cases.insert(endpoints::TRANSACTIONS_API, false);
        cases.insert(endpoints::EXCHANGE_RATES_WIDGET, false);

        for (endpoint, should_be_active) in cases {
            let nav_bar = NavBar::new(endpoint);

            assert_link_active(nav_bar, endpoint, should_be_active);
        }
    }

    #[track_caller]
    fn assert_link_active(nav_bar: NavBar<'_>, endpoint: &str, should_be_active: bool) {
        let get_active_string = |is_active: bool| -> &str {
            if is_active {
                "active (true)"
            } else {
                "inactive (false)"
            }
        };

        for link in nav_bar.links {
            if link.url == endpoint {
                assert_eq!(
                    link.is_current,
                    should_be_active,
                    "Link for current page should be {} but got {}",
                    get_active_string(should_be_active),
                    get_active_string(link.is_current),
                )
            } else {
                assert!(
                    !link.is_current,
                    "Link for inactive page should {} but got {}",
                    get_active_string(false),
                    get_active_string(link.is_current)
                )
            }
        }
    }
}
