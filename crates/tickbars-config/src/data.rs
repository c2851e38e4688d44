//! Trade input configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tickbars_batch::{BatchConfig, DEFAULT_PAGE_SIZE};
use tickbars_io::TradeLayout;

/// Trade input and paging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Trade files for batch runs, read in order as one trade stream
    pub input_paths: Vec<PathBuf>,

    /// Column layout of the trade file
    pub layout: TradeLayout,

    /// Rows read per page
    pub page_size: usize,

    /// Pages read ahead on a background thread (0 = none)
    pub prefetch_pages: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_paths: Vec::new(),
            layout: TradeLayout::Epoch,
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_pages: 0,
        }
    }
}

impl DataConfig {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            page_size: self.page_size,
            prefetch_pages: self.prefetch_pages,
        }
    }
}
