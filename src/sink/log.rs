//! Sink that logs points instead of storing them.

use crate::point::Point;
use crate::sink::{Sink, SinkError, SinkTarget};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Sink for LogSink {
    async fn write(&self, point: &Point, target: &SinkTarget) -> Result<(), SinkError> {
        tracing::info!(
            bucket = %target.bucket,
            org = %target.org,
            measurement = %point.measurement,
            "{}",
            point.to_line_protocol()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collected;
    use crate::point::PointBuilder;

    #[tokio::test]
    async fn test_log_sink_accepts_points() {
        let record = serde_json::from_value(serde_json::json!({"usage_pct": 1.0})).unwrap();
        let points = PointBuilder::new().build("cpu_monitor", Collected::One(record));

        let sink = LogSink::new();
        let target = SinkTarget::new("metrics", "home");
        for point in &points {
            sink.write(point, &target).await.unwrap();
        }
    }
}
