//! JSON-lines sample output for the demo binary.

use crate::error::ProviderError;
use crate::location::{LocationObserver, LocationSample};
use std::io::Write;
use tracing::{error, warn};

/// Writes one JSON object per delivered sample.
///
/// The first write failure (typically a closed pipe) is logged and all
/// later samples are discarded.
pub struct JsonLinesObserver<W: Write> {
    out: W,
    written: usize,
    failed: bool,
}

impl<W: Write> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            failed: false,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_sample(&mut self, sample: &LocationSample) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, sample)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> LocationObserver for JsonLinesObserver<W> {
    fn on_sample(&mut self, sample: &LocationSample) {
        if self.failed {
            return;
        }

        match self.write_sample(sample) {
            Ok(()) => self.written += 1,
            Err(e) => {
                error!(error = %e, "cannot write sample; discarding further output");
                self.failed = true;
            }
        }
    }

    fn on_permission_denied(&mut self) {
        warn!("location permission denied; run again without --deny to grant it");
    }

    fn on_provider_unavailable(&mut self, error: &ProviderError) {
        warn!(%error, "location updates unavailable");
    }
}
