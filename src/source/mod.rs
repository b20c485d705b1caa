// Packet sources
//
// A source yields parsed `PacketRecord`s and owns the capture device's
// tuning. Byte-level capture and decoding live behind this trait.

pub mod synth;

pub use synth::{SynthConfig, SyntheticSource};

use crate::engine::channel::ChannelDef;
use crate::error::Result;
use crate::wlan::PacketRecord;
use std::time::Instant;

pub trait PacketSource {
    /// Next record captured up to `now`, `None` once caught up
    fn next_record(&mut self, now: Instant) -> Option<PacketRecord>;

    /// Tune the capture device to channel table entry `idx`
    fn tune(&mut self, idx: usize, channel: &ChannelDef) -> Result<()> {
        let _ = (idx, channel);
        Ok(())
    }

    /// Short label for logs
    fn name(&self) -> &str;
}
