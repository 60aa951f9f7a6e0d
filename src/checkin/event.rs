use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// 活動代號：當地時間 `YYYYMMDD-HHMM`
pub fn event_id(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y%m%d-%H%M").to_string()
}

/// 報表預設標籤：當地日期 `YYYYMMDD`
pub fn date_label(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y%m%d").to_string()
}
