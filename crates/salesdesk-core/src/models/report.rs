use chrono::{Duration, Local, NaiveDate};

use crate::api::ApiError;

/// Days covered by the default report range, today included.
const DEFAULT_REPORT_DAYS: i64 = 30;

/// Inclusive date range for the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ApiError> {
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "Report start {} is after end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// The `days` days ending on `today`.
    pub fn ending_on(today: NaiveDate, days: i64) -> Self {
        Self {
            from: today - Duration::days(days.max(1) - 1),
            to: today,
        }
    }

    /// Fill in whichever bound is missing from the default range.
    pub fn resolve(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ApiError> {
        let today = Local::now().date_naive();
        let default = Self::ending_on(to.unwrap_or(today), DEFAULT_REPORT_DAYS);
        Self::new(from.unwrap_or(default.from), to.unwrap_or(default.to))
    }

    pub fn from_param(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }

    pub fn pdf_file_name(&self) -> String {
        format!("reporte_ventas_{}_a_{}.pdf", self.from_param(), self.to_param())
    }
}
