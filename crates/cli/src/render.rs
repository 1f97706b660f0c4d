//! Plain-text rendering of the daily sales report.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use erpsales_core::BranchId;
use erpsales_sales::{BranchSales, DailyAggregate, DailySalesBreakdown, NetSalesReport, ProductSales};

const RULE_WIDTH: usize = 70;
const BAR_WIDTH: u32 = 50;
const BAR_CELL: char = '█';

pub struct TextStyle<'a> {
    pub currency: &'a str,
    /// The product limit that was asked for (the heading shows it even when
    /// fewer products sold).
    pub top_limit: u32,
    pub summary_only: bool,
}

/// A breakdown laid out for the terminal.
pub struct TextReport<'a> {
    breakdown: &'a DailySalesBreakdown,
    style: &'a TextStyle<'a>,
}

impl<'a> TextReport<'a> {
    pub fn new(breakdown: &'a DailySalesBreakdown, style: &'a TextStyle<'a>) -> Self {
        Self { breakdown, style }
    }

    fn money(&self, value: Decimal) -> String {
        format_money(value, self.style.currency)
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>, report: &NetSalesReport) -> fmt::Result {
        let gross: &DailyAggregate = report.gross_sales();
        let returns: &DailyAggregate = report.returns();

        writeln!(f)?;
        writeln!(f, "SALES SUMMARY")?;
        rule(f)?;

        writeln!(f)?;
        writeln!(f, "GROSS SALES:")?;
        writeln!(f, "   Total Bills: {}", gross.bill_count())?;
        writeln!(f, "   Gross Amount: {}", self.money(gross.amount()))?;
        writeln!(f, "   Tax (VAT): {}", self.money(gross.tax()))?;
        writeln!(f, "   Discount: {}", self.money(gross.discount()))?;

        writeln!(f)?;
        writeln!(f, "RETURNS:")?;
        writeln!(f, "   Total Returns: {}", returns.bill_count())?;
        writeln!(f, "   Return Amount: {}", self.money(returns.amount()))?;
        writeln!(f, "   Return Tax: {}", self.money(returns.tax()))?;

        writeln!(f)?;
        writeln!(f, "NET SALES:")?;
        writeln!(f, "   Net Bills: {}", report.net_bill_count())?;
        writeln!(f, "   Net Amount: {}", self.money(report.net_amount()))?;
        writeln!(f, "   Net Tax: {}", self.money(report.net_tax()))?;

        writeln!(f)?;
        rule(f)
    }

    fn write_products(&self, f: &mut fmt::Formatter<'_>, products: &[ProductSales]) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "TOP {} SELLING PRODUCTS:", self.style.top_limit)?;
        rule(f)?;
        writeln!(f)?;

        if products.is_empty() {
            writeln!(f, "   No sales recorded for this date.")?;
        }
        for (index, product) in products.iter().enumerate() {
            writeln!(
                f,
                "{}. {}",
                index + 1,
                product.description.as_deref().unwrap_or("(No Name)")
            )?;
            writeln!(
                f,
                "   Qty: {} | Amount: {}",
                format_grouped(product.quantity, 2, 3),
                self.money(product.amount)
            )?;
        }

        writeln!(f)?;
        rule(f)
    }

    fn write_branches(
        &self,
        f: &mut fmt::Formatter<'_>,
        branches: &[BranchSales],
        gross_amount: Decimal,
    ) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "SALES BY BRANCH:")?;
        rule(f)?;
        writeln!(f)?;

        if branches.is_empty() {
            writeln!(f, "   No branch data available.")?;
        }
        for branch in branches {
            writeln!(
                f,
                "{:<15} | {} {} bills | {}",
                branch_name(branch.branch),
                bar(branch, gross_amount),
                branch.bill_count,
                self.money(branch.amount)
            )?;
        }

        writeln!(f)?;
        rule(f)
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.breakdown.summary;
        writeln!(f, "Sales for {}", summary.date())?;
        rule(f)?;
        self.write_summary(f, summary)?;

        if self.style.summary_only {
            return Ok(());
        }
        self.write_products(f, &self.breakdown.top_products)?;
        self.write_branches(f, &self.breakdown.branches, summary.gross_sales().amount())
    }
}

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

fn branch_name(branch: BranchId) -> String {
    if branch.is_main() {
        "Main Branch".to_string()
    } else {
        format!("Branch {branch}")
    }
}

/// `floor(share * 50)` cells; empty when the day has no positive gross.
fn bar(branch: &BranchSales, gross_amount: Decimal) -> String {
    let cells = branch
        .share_of(gross_amount)
        .and_then(|share| (share * Decimal::from(BAR_WIDTH)).floor().to_usize())
        .unwrap_or(0);
    BAR_CELL.to_string().repeat(cells)
}

/// `value` with two decimals, en-IN grouping and a currency symbol, e.g.
/// `₹12,34,567.89` or `-₹150.00`.
pub fn format_money(value: Decimal, currency: &str) -> String {
    let grouped = format_grouped(value, 2, 2);
    match grouped.strip_prefix('-') {
        Some(abs) => format!("-{currency}{abs}"),
        None => format!("{currency}{grouped}"),
    }
}

/// Indian digit grouping (last three digits, then pairs) with between
/// `min_frac` and `max_frac` fraction digits, rounding half away from zero.
pub fn format_grouped(value: Decimal, min_frac: u32, max_frac: u32) -> String {
    let rounded = value.round_dp_with_strategy(max_frac, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < min_frac as usize {
        frac.push('0');
    }

    let mut out = String::with_capacity(digits.len() + int_part.len() / 2 + 2);
    if negative {
        out.push('-');
    }
    out.push_str(&group_indian(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

fn group_indian(int_part: &str) -> String {
    if int_part.len() <= 3 {
        return int_part.to_string();
    }
    let (head, last_three) = int_part.split_at(int_part.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{last_three}", groups.join(","))
}
