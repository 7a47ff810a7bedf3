//! Dump service: streams published package payloads as JSON lines.

use std::io::Write;

use tracing::info;

use crate::error::AppError;
use crate::model::SourceKind;
use crate::pipeline::conversion_watermark_key;
use crate::traits::{PackageStore, WatermarkStore};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// Which package updates a dump includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpMode {
    /// Every stored update for the source.
    All,
    /// Updates written at or after this timestamp.
    Since(String),
    /// Updates written since the source's last conversion run.
    Monitor,
}

/// Pages the publish sink in id order and writes one serialized payload
/// per line.
pub struct DumpService<P, W> {
    packages: P,
    watermarks: W,
    page_size: u32,
}

impl<P, W> DumpService<P, W>
where
    P: PackageStore,
    W: WatermarkStore,
{
    pub fn new(packages: P, watermarks: W) -> Self {
        Self {
            packages,
            watermarks,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub async fn run<Out: Write>(
        &self,
        source: SourceKind,
        mode: DumpMode,
        out: &mut Out,
    ) -> Result<u64, AppError> {
        let updated_since = match mode {
            DumpMode::All => None,
            DumpMode::Since(since) => Some(since),
            DumpMode::Monitor => {
                self.watermarks
                    .get(&conversion_watermark_key(source))
                    .await?
            }
        };

        let mut written = 0u64;
        let mut last_id = 0i64;
        loop {
            let batch = self
                .packages
                .list_batch(source, last_id, self.page_size, updated_since.as_deref())
                .await?;
            if batch.is_empty() {
                break;
            }
            for package in &batch {
                last_id = package.id;
                writeln!(out, "{}", package.payload)?;
                written += 1;
            }
        }
        info!(source = %source, written, "Dump complete");
        Ok(written)
    }
}
