//! Chart generation and rendering for the dashboard and reports pages.
//!
//! Charts are built with charming as ECharts options and initialised by a
//! small script once the page has loaded:
//! - **Income vs. expenses**: monthly totals for the recent months
//! - **Spending by category**: a donut chart of the expense categories

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Color, Emphasis, EmphasisFocus,
        ItemStyle, JsFunction, Tooltip, Trigger,
    },
    series::{Pie, bar},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    currency::Currency,
    html::HeadElement,
    report::{CategoryAnalysis, MonthlyTrend},
};

/// The ECharts build served from the static directory.
pub(crate) const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

/// A chart with its HTML container ID and ECharts configuration.
pub(crate) struct PageChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for `charts` in a two column grid.
pub(crate) fn charts_view(charts: &[PageChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// The head elements that load ECharts and initialise `charts`, following
/// the browser's dark mode setting and resizing with the window.
pub(crate) fn charts_head_elements(charts: &[PageChart]) -> [HeadElement; 2] {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        HeadElement::ScriptSource(PreEscaped(wrapped_script)),
    ]
}

/// Monthly income and expenses side by side.
pub(crate) fn income_expense_chart(trends: &[MonthlyTrend], currency: Currency) -> Chart {
    let labels: Vec<String> = trends
        .iter()
        .map(|trend| trend.month_name.clone())
        .collect();
    let income: Vec<f64> = trends.iter().map(|trend| trend.summary.total_income).collect();
    let expenses: Vec<f64> = trends
        .iter()
        .map(|trend| trend.summary.total_expense)
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Income vs. Expenses")
                .subtext(format!("Last {} months in {currency}", trends.len())),
        )
        .tooltip(currency_tooltip(currency))
        .legend(Legend::new().right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(
            bar::Bar::new()
                .name("Income")
                .item_style(ItemStyle::new().color("#16a34a"))
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(income),
        )
        .series(
            bar::Bar::new()
                .name("Expenses")
                .item_style(ItemStyle::new().color("#dc2626"))
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(expenses),
        )
}

/// The share of spending per expense category.
pub(crate) fn category_chart(analysis: &CategoryAnalysis) -> Chart {
    let data: Vec<(f64, String)> = analysis
        .categories
        .iter()
        .map(|spending| (spending.amount, spending.category_info.name.to_owned()))
        .collect();
    let colors: Vec<&str> = analysis
        .categories
        .iter()
        .map(|spending| spending.category_info.color)
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Spending by Category")
                .subtext(format!(
                    "{} to {}",
                    analysis.period.start_date, analysis.period.end_date
                )),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter(analysis.currency)),
        )
        .color(colors.into_iter().map(Color::from).collect::<Vec<_>>())
        .series(
            Pie::new()
                .name("Expenses")
                .radius(vec!["40%", "70%"])
                .center(vec!["50%", "55%"])
                .data(data),
        )
}

fn currency_formatter(currency: Currency) -> JsFunction {
    JsFunction::new_with_args(
        "number",
        &format!(
            "const currencyFormatter = new Intl.NumberFormat('en-US', {{
                  style: 'currency',
                  currency: '{}'
                }});
                return (number) ? currencyFormatter.format(number) : \"-\";",
            currency.code()
        ),
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip(currency: Currency) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter(currency))
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
