//! Balances, monthly summaries, category breakdowns and trends.

mod api;
mod reports_page;
mod summary;

pub use api::{
    ReportState, balance_stats_api, category_stats_api, monthly_stats_api, quick_stats_widget,
    summary_api, trends_stats_api,
};
pub use reports_page::get_reports_page;
pub use summary::{
    CategoryAnalysis, DEFAULT_ANALYSIS_DAYS, MonthlySummary, MonthlyTrend, balance_summary,
    category_analysis, monthly_summary, percentage_change, trends,
};
#[cfg(test)]
pub(crate) use summary::{CategorySpending, ReportPeriod};
