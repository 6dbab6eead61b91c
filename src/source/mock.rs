//! Mock source with canned report lines for tests and demos.

use crate::error::Result;
use crate::source::InvariantSource;
use async_trait::async_trait;
use std::path::Path;

pub struct MockSource {
    lines: Vec<String>,
}

impl MockSource {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        let lines = [
            "pump1 one of { 0.0, 1.0 , 2.0 }",
            "valve1 one of { 0.0, 1.0 }",
            "pump1 == pump2",
            "max_tank_level == 800.0",
            "min_tank_level == 250.0",
            "tank_level < max_tank_level",
            "tank_level > min_tank_level",
            "tank_level != 0.0",
        ];
        Self::new(lines.iter().map(|l| l.to_string()).collect())
    }
}

#[async_trait]
impl InvariantSource for MockSource {
    async fn fetch_report(&self, _dataset: &Path) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_mock_report() {
        let source = MockSource::default();
        let lines = source
            .fetch_report(Path::new("registers.csv"))
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.contains("one of")));
    }
}
