use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of campaign columns.
///
/// Uploaded headers are checked against it (see [`HeaderCoverage`]) and
/// query filters are keyed by it. Declaration order is the order clauses
/// appear in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CampaignField {
    #[serde(rename = "Campaign_ID")]
    CampaignId,
    #[serde(rename = "Target_Audience")]
    TargetAudience,
    #[serde(rename = "Campaign_Goal")]
    CampaignGoal,
    #[serde(rename = "Duration")]
    Duration,
    #[serde(rename = "Channel_Used")]
    ChannelUsed,
    #[serde(rename = "Conversion_Rate")]
    ConversionRate,
    #[serde(rename = "Acquisition_Cost")]
    AcquisitionCost,
    #[serde(rename = "ROI")]
    Roi,
    #[serde(rename = "Location")]
    Location,
    #[serde(rename = "Language")]
    Language,
    #[serde(rename = "Clicks")]
    Clicks,
    #[serde(rename = "Impressions")]
    Impressions,
    #[serde(rename = "Engagement_Score")]
    EngagementScore,
    #[serde(rename = "Customer_Segment")]
    CustomerSegment,
    #[serde(rename = "Date")]
    Date,
    #[serde(rename = "Company")]
    Company,
}

impl CampaignField {
    /// Every field, in declared order.
    pub const ALL: [CampaignField; 16] = [
        CampaignField::CampaignId,
        CampaignField::TargetAudience,
        CampaignField::CampaignGoal,
        CampaignField::Duration,
        CampaignField::ChannelUsed,
        CampaignField::ConversionRate,
        CampaignField::AcquisitionCost,
        CampaignField::Roi,
        CampaignField::Location,
        CampaignField::Language,
        CampaignField::Clicks,
        CampaignField::Impressions,
        CampaignField::EngagementScore,
        CampaignField::CustomerSegment,
        CampaignField::Date,
        CampaignField::Company,
    ];

    /// Column name as it appears in the CSV header and in stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignField::CampaignId => "Campaign_ID",
            CampaignField::TargetAudience => "Target_Audience",
            CampaignField::CampaignGoal => "Campaign_Goal",
            CampaignField::Duration => "Duration",
            CampaignField::ChannelUsed => "Channel_Used",
            CampaignField::ConversionRate => "Conversion_Rate",
            CampaignField::AcquisitionCost => "Acquisition_Cost",
            CampaignField::Roi => "ROI",
            CampaignField::Location => "Location",
            CampaignField::Language => "Language",
            CampaignField::Clicks => "Clicks",
            CampaignField::Impressions => "Impressions",
            CampaignField::EngagementScore => "Engagement_Score",
            CampaignField::CustomerSegment => "Customer_Segment",
            CampaignField::Date => "Date",
            CampaignField::Company => "Company",
        }
    }
}

impl fmt::Display for CampaignField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown campaign field '{}'", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for CampaignField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CampaignField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// How an input header lines up with [`CampaignField`].
///
/// Columns outside the schema are still ingested, they just can never be
/// filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCoverage {
    /// Header columns that name no campaign field, in header order.
    pub unknown: Vec<String>,
    /// Campaign fields the header lacks, in declared order.
    pub missing: Vec<CampaignField>,
}

impl HeaderCoverage {
    pub fn of<S: AsRef<str>>(header: &[S]) -> Self {
        let mut present = Vec::with_capacity(header.len());
        let mut unknown = Vec::new();
        for column in header {
            match column.as_ref().parse::<CampaignField>() {
                Ok(field) => present.push(field),
                Err(UnknownField(name)) => unknown.push(name),
            }
        }
        let missing = CampaignField::ALL
            .into_iter()
            .filter(|field| !present.contains(field))
            .collect();
        Self { unknown, missing }
    }

    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty() && self.missing.is_empty()
    }
}
