use crate::domain::model::{AttendanceColumns, AttendanceReport, AttendanceSheet};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn report_label(&self) -> &str;
    fn columns(&self) -> &AttendanceColumns;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<AttendanceSheet>;
    async fn transform(&self, sheet: AttendanceSheet) -> Result<AttendanceReport>;
    async fn load(&self, report: AttendanceReport) -> Result<String>;
}

/// 寄信的傳輸層，測試時以記憶體實作替換
pub trait Mailer: Send + Sync {
    fn deliver(
        &self,
        message: lettre::Message,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Google Forms REST API 的操作集合
#[async_trait]
pub trait FormsApi: Send + Sync {
    async fn create_form(&self, title: &str) -> Result<serde_json::Value>;
    async fn batch_update(
        &self,
        form_id: &str,
        requests_body: &serde_json::Value,
    ) -> Result<serde_json::Value>;
    async fn get_form(&self, form_id: &str) -> Result<serde_json::Value>;
    async fn set_publish_settings(
        &self,
        form_id: &str,
        published: bool,
    ) -> Result<serde_json::Value>;
}
