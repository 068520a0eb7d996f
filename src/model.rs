use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Decimal places kept when a ratio is written out.
pub const RATIO_SCALE: u32 = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ExpectedChannel {
    Facebook,
    GoogleAds,
    Instagram,
    TikTok,
    YouTube,
}

impl ExpectedChannel {
    pub const ALL: [Self; 5] = [
        Self::Facebook,
        Self::GoogleAds,
        Self::Instagram,
        Self::TikTok,
        Self::YouTube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::GoogleAds => "Google Ads",
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::YouTube => "YouTube",
        }
    }

    /// Looks up an already trimmed, lower-cased channel label.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "facebook" => Some(Self::Facebook),
            "google ads" | "google ad" | "googleads" => Some(Self::GoogleAds),
            "instagram" => Some(Self::Instagram),
            "tiktok" => Some(Self::TikTok),
            "youtube" => Some(Self::YouTube),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Facebook => 0,
            Self::GoogleAds => 1,
            Self::Instagram => 2,
            Self::TikTok => 3,
            Self::YouTube => 4,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Channel {
    Expected(ExpectedChannel),
    Fallback(String),
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Expected(channel) => channel.as_str(),
            Self::Fallback(label) => label,
        }
    }

    pub fn expected(&self) -> Option<ExpectedChannel> {
        match self {
            Self::Expected(channel) => Some(*channel),
            Self::Fallback(_) => None,
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One spend-export row exactly as it appeared in the CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMarketingRow {
    pub month: String,
    pub channel: String,
    pub spend_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketingRecord {
    pub month: Option<NaiveDate>,
    pub channel: Channel,
    pub spend_amount: Option<Decimal>,
    pub negative_spend_flag: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: Option<NaiveDate>,
    pub order_amount: Option<Decimal>,
    pub product_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    pub month: NaiveDate,
    pub order_count: u64,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCategorySales {
    pub month: NaiveDate,
    pub product_category: String,
    pub order_count: u64,
    pub total_sales: Decimal,
}

/// `record_count` separates "records present but none valued" from "no records".
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySpend {
    pub month: NaiveDate,
    pub marketing_spend: Option<Decimal>,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesMarketingRow {
    pub month: NaiveDate,
    pub order_count: u64,
    pub total_sales: Decimal,
    pub marketing_spend: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRoi {
    pub month: NaiveDate,
    pub total_sales: Decimal,
    pub marketing_spend: Option<Decimal>,
    #[serde(serialize_with = "serialize_ratio")]
    pub roi: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCompletenessRow {
    pub month: NaiveDate,
    pub channel_spend: [Option<Decimal>; 5],
    pub complete_all_channels: bool,
    pub missing_channels: usize,
}

impl ChannelCompletenessRow {
    pub fn spend_for(&self, channel: ExpectedChannel) -> Option<Decimal> {
        self.channel_spend[channel.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRanking {
    pub customer_id: String,
    pub orders_count: u64,
    pub total_spent: Decimal,
}

fn serialize_ratio<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(ratio) => {
            serializer.serialize_str(&ratio.round_dp(RATIO_SCALE).normalize().to_string())
        }
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHash {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPaths {
    pub workspace_root: String,
    pub db_path: String,
    pub marketing_csv_path: String,
    pub output_dir: String,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportCounts {
    pub orders_loaded: usize,
    pub orders_without_date: usize,
    pub orders_without_amount: usize,
    pub marketing_rows: usize,
    pub marketing_rows_without_month: usize,
    pub spend_values_missing: usize,
    pub negative_spend_rows: usize,
    pub fallback_channel_rows: usize,
    pub months_reported: usize,
    pub months_without_spend: usize,
    pub incomplete_channel_months: usize,
    pub customers_ranked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: ReportPaths,
    pub counts: ReportCounts,
    pub source_hashes: Vec<SourceHash>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
