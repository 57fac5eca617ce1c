use tracing::debug;

use super::client::APP_NAME;
use super::{scan, FetchError, PortalConfig};
use crate::auth::Session;
use crate::calendar::{decode_utf16le, MonthCalendar, MonthKey};
use crate::utils::truncate_string;

const EXPORT_PROGRAM: &str = "SCHEDULER_EXPORT_START";
const EXPORT_ARGUMENTS: &str = "sessionno,menuid,date";
const EXPORT_MENU_ID: &str = "000272";
const EXPORT_WEEK: &str = "0";

/// Characters of an unexpected response body kept in log output.
const LOG_BODY_MAX_CHARS: usize = 200;

/// Drives the portal's export workflow for one month at a time.
///
/// Calls are independent of each other and may run concurrently on the same
/// [`Session`].
#[derive(Debug, Clone)]
pub struct MonthExporter {
    portal: PortalConfig,
}

impl MonthExporter {
    pub fn new(portal: PortalConfig) -> Self {
        Self { portal }
    }

    /// Request the export for `month`, download it and decode it.
    pub async fn export_month(
        &self,
        session: &Session,
        month: MonthKey,
    ) -> Result<MonthCalendar, FetchError> {
        let token = month.token();
        let form = [
            ("APPNAME", APP_NAME),
            ("PRGNAME", EXPORT_PROGRAM),
            ("ARGUMENTS", EXPORT_ARGUMENTS),
            ("sessionno", session.id()),
            ("menuid", EXPORT_MENU_ID),
            ("date", token.as_str()),
            ("month", token.as_str()),
            ("week", EXPORT_WEEK),
        ];

        let response = session
            .client()
            .post(self.portal.entry_url().clone())
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if scan::is_access_denied(&body) {
            debug!(
                month = %month,
                body = %truncate_string(&body, LOG_BODY_MAX_CHARS),
                "Export request denied"
            );
            return Err(FetchError::AccessDenied);
        }

        if scan::has_no_events(&body) {
            return Err(FetchError::NoEvents);
        }

        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let link = scan::find_download_link(&body).ok_or(FetchError::NoDownloadLink)?;
        let url = self.portal.resolve(&link)?;

        debug!(month = %month, "Downloading calendar export");
        let bytes = session
            .client()
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let text = decode_utf16le(&bytes)?;
        Ok(MonthCalendar::new(month, text))
    }
}
