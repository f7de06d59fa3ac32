//! Listing methods and time filters understood by the subreddit endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A sort/filter strategy for retrieving posts from a subreddit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingMethod {
    Hot,
    New,
    Controversial,
    Rising,
    Top,
}

/// Name lookup for [`ListingMethod`]. Anything not in this table is rejected.
const METHODS: [(&str, ListingMethod); 5] = [
    ("hot", ListingMethod::Hot),
    ("new", ListingMethod::New),
    ("controversial", ListingMethod::Controversial),
    ("rising", ListingMethod::Rising),
    ("top", ListingMethod::Top),
];

impl ListingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingMethod::Hot => "hot",
            ListingMethod::New => "new",
            ListingMethod::Controversial => "controversial",
            ListingMethod::Rising => "rising",
            ListingMethod::Top => "top",
        }
    }

    /// Only `top` listings are restricted by a time window.
    pub fn takes_time_filter(&self) -> bool {
        matches!(self, ListingMethod::Top)
    }

    /// The tag stored on each post fetched with this method, e.g. `hot` or
    /// `top_week`.
    pub fn tag(&self, time_filter: TimeFilter) -> String {
        if self.takes_time_filter() {
            format!("{}_{}", self.as_str(), time_filter)
        } else {
            self.as_str().to_string()
        }
    }
}

impl FromStr for ListingMethod {
    type Err = ParseListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METHODS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, method)| *method)
            .ok_or_else(|| ParseListingError::UnsupportedMethod(s.to_string()))
    }
}

impl fmt::Display for ListingMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts `top` results to posts created within a recent period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl FromStr for TimeFilter {
    type Err = ParseListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(TimeFilter::Hour),
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            _ => Err(ParseListingError::UnsupportedTimeFilter(s.to_string())),
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing method name paired with how many posts to request from it.
///
/// The name is kept as written in the configuration and only checked
/// against [`ListingMethod`] when a fetch is planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodLimit {
    pub method: String,
    pub limit: u32,
}

impl MethodLimit {
    pub fn new(method: impl Into<String>, limit: u32) -> Self {
        Self {
            method: method.into(),
            limit,
        }
    }
}

/// Parses `name=limit`, as given on the command line.
impl FromStr for MethodLimit {
    type Err = ParseListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseListingError::InvalidMethodLimit(s.to_string());
        let (method, limit) = s.split_once('=').ok_or_else(invalid)?;
        let method = method.trim();
        if method.is_empty() {
            return Err(invalid());
        }
        let limit = limit.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(method, limit))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseListingError {
    #[error("unsupported listing method '{0}' (expected one of hot, new, controversial, rising, top)")]
    UnsupportedMethod(String),

    #[error("unsupported time filter '{0}' (expected one of hour, day, week, month, year, all)")]
    UnsupportedTimeFilter(String),

    #[error("invalid method limit '{0}' (expected name=limit, e.g. hot=100)")]
    InvalidMethodLimit(String),
}
