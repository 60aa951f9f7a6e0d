use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting attendance intake...");
        self.monitor.log_stats("Start");

        // Extract
        let sheet = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} attendance rows ({} skipped)",
            sheet.records.len(),
            sheet.skipped_rows
        );
        self.monitor.log_stats("Extract");

        // Transform
        let report = self.pipeline.transform(sheet).await?;
        tracing::info!(
            "Cleaned sheet: {} unique attendees, {} duplicates removed",
            report.summary.unique_attendees,
            report.summary.duplicates_removed
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Report saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
