//! Discount code classification.
//!
//! A site attaches a discount code to each torrent which decides how upload
//! and download traffic are accounted. [`classify`] is the only place these
//! codes are turned into [`EconomicAttributes`].

use serde::{Deserialize, Serialize};

/// Closed set of discount codes understood by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscountCode {
    /// Upload counted twice, download not counted.
    #[serde(rename = "_2X_FREE")]
    DoubleUploadFree,
    /// Upload counted twice, half of the download counted.
    #[serde(rename = "_2X_PERCENT_50")]
    DoubleUploadHalfDownload,
    /// Upload counted twice, download counted normally.
    #[serde(rename = "_2X")]
    DoubleUpload,
    /// Half of the download counted.
    #[serde(rename = "PERCENT_50")]
    HalfDownload,
    /// 30% of the download counted.
    #[serde(rename = "PERCENT_30")]
    ThirtyPercentDownload,
    /// Download not counted.
    #[serde(rename = "FREE")]
    Free,
    /// Everything counted normally. Also used for unknown codes.
    #[serde(rename = "NORMAL")]
    Normal,
}

impl DiscountCode {
    /// Parse a wire code. Unknown and absent codes map to [`DiscountCode::Normal`].
    pub fn parse(code: Option<&str>) -> Self {
        match code {
            Some("_2X_FREE") => Self::DoubleUploadFree,
            Some("_2X_PERCENT_50") => Self::DoubleUploadHalfDownload,
            Some("_2X") => Self::DoubleUpload,
            Some("PERCENT_50") => Self::HalfDownload,
            Some("PERCENT_30") => Self::ThirtyPercentDownload,
            Some("FREE") => Self::Free,
            _ => Self::Normal,
        }
    }

    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoubleUploadFree => "_2X_FREE",
            Self::DoubleUploadHalfDownload => "_2X_PERCENT_50",
            Self::DoubleUpload => "_2X",
            Self::HalfDownload => "PERCENT_50",
            Self::ThirtyPercentDownload => "PERCENT_30",
            Self::Free => "FREE",
            Self::Normal => "NORMAL",
        }
    }

    /// Economic attributes implied by this code.
    pub fn attributes(&self) -> EconomicAttributes {
        let (is_free, is_double_free, download_factor, upload_factor) = match self {
            Self::DoubleUploadFree => (true, true, 0.0, 2.0),
            Self::DoubleUploadHalfDownload => (true, true, 0.5, 2.0),
            Self::DoubleUpload => (true, true, 1.0, 2.0),
            Self::HalfDownload => (false, false, 0.5, 1.0),
            Self::ThirtyPercentDownload => (false, false, 0.3, 1.0),
            Self::Free => (true, false, 0.0, 1.0),
            Self::Normal => (false, false, 1.0, 1.0),
        };

        EconomicAttributes {
            is_free,
            is_double_free,
            is_hit_and_run: false,
            download_factor,
            upload_factor,
        }
    }
}

/// Upload/download accounting attached to a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomicAttributes {
    pub is_free: bool,
    /// Upload bonus variant (any `_2X*` code).
    pub is_double_free: bool,
    /// Seeding obligation. Never derived from the discount code.
    pub is_hit_and_run: bool,
    /// Share of the downloaded volume that is accounted, in `[0, 1]`.
    pub download_factor: f64,
    /// Multiplier applied to uploaded volume, `>= 1.0`.
    pub upload_factor: f64,
}

impl Default for EconomicAttributes {
    fn default() -> Self {
        DiscountCode::Normal.attributes()
    }
}

/// Classify a raw discount code.
pub fn classify(code: Option<&str>) -> EconomicAttributes {
    DiscountCode::parse(code).attributes()
}
