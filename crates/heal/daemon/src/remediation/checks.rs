//! Host verification checks.

use async_trait::async_trait;
use heal_engine::{CheckError, MetricSource};
use sysinfo::System;
use tokio::sync::Mutex;

/// Used-memory percentage of the host.
pub struct SystemMemory {
    system: Mutex<System>,
}

impl SystemMemory {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for SystemMemory {
    async fn read(&self) -> Result<f64, CheckError> {
        let mut system = self.system.lock().await;
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(CheckError("total memory reported as zero".to_string()));
        }
        Ok(system.used_memory() as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_reading_is_a_percentage() {
        let percent = SystemMemory::new().read().await.unwrap();
        assert!((0.0..=100.0).contains(&percent));
    }
}
