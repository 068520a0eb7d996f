use anyhow::Result;

use crate::model::{
    ChannelCompletenessRow, CustomerRanking, MarketingRecord, MonthlyCategorySales, MonthlyRoi,
    MonthlySales, MonthlySpend, OrderRecord, RawMarketingRow, ReportCounts, SalesMarketingRow,
};

use super::aggregate::{join_sales_and_spend, monthly_category_sales, monthly_sales, monthly_spend};
use super::completeness::channel_completeness;
use super::normalize::MarketingNormalizer;
use super::ranking::top_customers;
use super::roi::monthly_roi;

/// Every table a report run produces, computed before anything is written.
#[derive(Debug, Clone)]
pub struct ReportTables {
    pub marketing_clean: Vec<MarketingRecord>,
    pub monthly_sales: Vec<MonthlySales>,
    pub monthly_category_sales: Vec<MonthlyCategorySales>,
    pub monthly_spend: Vec<MonthlySpend>,
    pub sales_marketing: Vec<SalesMarketingRow>,
    pub monthly_roi: Vec<MonthlyRoi>,
    pub top_customers: Vec<CustomerRanking>,
    pub channel_completeness: Vec<ChannelCompletenessRow>,
}

pub fn build_report(
    normalizer: &MarketingNormalizer,
    orders: &[OrderRecord],
    raw_marketing: &[RawMarketingRow],
    top_n: usize,
) -> Result<ReportTables> {
    let marketing_clean = normalizer.normalize_all(raw_marketing);

    let sales = monthly_sales(orders)?;
    let spend = monthly_spend(&marketing_clean)?;
    let sales_marketing = join_sales_and_spend(&sales, &spend);
    let roi = monthly_roi(&sales_marketing);

    Ok(ReportTables {
        monthly_category_sales: monthly_category_sales(orders)?,
        top_customers: top_customers(orders, top_n)?,
        channel_completeness: channel_completeness(&marketing_clean)?,
        monthly_sales: sales,
        monthly_spend: spend,
        sales_marketing,
        monthly_roi: roi,
        marketing_clean,
    })
}

impl ReportTables {
    pub fn counts(&self, orders: &[OrderRecord]) -> ReportCounts {
        let records = &self.marketing_clean;

        ReportCounts {
            orders_loaded: orders.len(),
            orders_without_date: orders.iter().filter(|o| o.order_date.is_none()).count(),
            orders_without_amount: orders.iter().filter(|o| o.order_amount.is_none()).count(),
            marketing_rows: records.len(),
            marketing_rows_without_month: records.iter().filter(|r| r.month.is_none()).count(),
            spend_values_missing: records.iter().filter(|r| r.spend_amount.is_none()).count(),
            negative_spend_rows: records.iter().filter(|r| r.negative_spend_flag).count(),
            fallback_channel_rows: records
                .iter()
                .filter(|r| r.channel.expected().is_none())
                .count(),
            months_reported: self.sales_marketing.len(),
            months_without_spend: self
                .sales_marketing
                .iter()
                .filter(|row| row.marketing_spend.is_none())
                .count(),
            incomplete_channel_months: self
                .channel_completeness
                .iter()
                .filter(|row| !row.complete_all_channels)
                .count(),
            customers_ranked: self.top_customers.len(),
        }
    }
}
