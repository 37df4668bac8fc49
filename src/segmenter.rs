//! Online change-point segmentation over matched normal/tumor positions.

use crate::fisher::{significance, FisherExact};
use crate::pileup::MatchedPosition;
use crate::quality::quality_depth;

#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    pub min_coverage: u64,
    pub min_base_qual: u32,
    pub min_segment_size: u64,
    pub max_segment_size: u64,
    pub p_value_threshold: f64,
}

/// A contiguous run of positions currently being extended. Modeled as
/// `Option<RunningSegment>` inside the segmenter rather than the
/// original's "open iff chrom is not the empty string" sentinel; this is
/// a representation change only, the open/closed semantics are identical.
#[derive(Debug, Clone)]
pub struct RunningSegment {
    pub chrom: String,
    pub start: u64,
    pub stop: u64,
    pub depth_normal: u64,
    pub depth_tumor: u64,
    pub sum_normal: u64,
    pub sum_tumor: u64,
    pub positions: u64,
    pub gc_positions: u64,
}

fn is_gc(base: char) -> bool {
    matches!(base, 'C' | 'G')
}

/// Consumes matched normal/tumor positions one at a time and produces
/// closed segments as change points are detected.
pub struct CopyNumberSegmenter {
    config: SegmenterConfig,
    fisher: FisherExact,
    segment: Option<RunningSegment>,
}

impl CopyNumberSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config, fisher: FisherExact::new(256), segment: None }
    }

    /// Processes one matched position. Returns a segment that just closed
    /// and is a candidate for emission (the caller still applies the
    /// minimum-coverage gate before writing it out).
    pub fn process(&mut self, pos: &MatchedPosition) -> Option<RunningSegment> {
        if pos.normal_raw_depth < self.config.min_coverage
            || pos.normal_quals.is_empty()
        {
            return self.close_gap();
        }

        let normal_depth = quality_depth(&pos.normal_quals, self.config.min_base_qual);
        let tumor_depth = if pos.tumor_quals.is_empty() {
            0
        } else {
            quality_depth(&pos.tumor_quals, self.config.min_base_qual)
        };

        if self.should_extend(pos, normal_depth, tumor_depth) {
            self.extend(pos, normal_depth, tumor_depth);
            None
        } else {
            let closed = self.close_if_qualifying();
            self.start(pos, normal_depth, tumor_depth);
            closed
        }
    }

    /// Flushes the currently open segment at end of input. Uses the
    /// original's strict `>` threshold here, rather than the `>=` used
    /// mid-stream when closing on a gap or change point -- an asymmetry
    /// present in the original and reproduced deliberately.
    pub fn finish(&mut self) -> Option<RunningSegment> {
        match self.segment.take() {
            Some(seg) if seg.positions > self.config.min_segment_size => Some(seg),
            _ => None,
        }
    }

    fn should_extend(
        &mut self,
        pos: &MatchedPosition,
        normal_depth: u64,
        tumor_depth: u64,
    ) -> bool {
        let seg = match &self.segment {
            Some(seg) => seg,
            None => return false,
        };

        let pos_diff = pos.pos as i64 - seg.stop as i64;
        if pos_diff > 2 || seg.chrom != pos.chrom {
            return false;
        }
        if seg.positions >= self.config.max_segment_size {
            return false;
        }

        let diff_normal = (seg.depth_normal as i64 - normal_depth as i64).unsigned_abs();
        let diff_tumor = (seg.depth_tumor as i64 - tumor_depth as i64).unsigned_abs();
        if diff_normal <= 2 && diff_tumor <= 2 {
            return true;
        }

        let p = significance(
            &mut self.fisher,
            seg.depth_normal,
            seg.depth_tumor,
            normal_depth,
            tumor_depth,
        );
        p >= self.config.p_value_threshold
    }

    fn extend(&mut self, pos: &MatchedPosition, normal_depth: u64, tumor_depth: u64) {
        let seg = self.segment.as_mut().expect("extend called with no open segment");
        seg.sum_normal += normal_depth;
        seg.sum_tumor += tumor_depth;
        seg.positions += 1;
        if is_gc(pos.ref_base) {
            seg.gc_positions += 1;
        }
        seg.stop = pos.pos;
    }

    fn start(&mut self, pos: &MatchedPosition, normal_depth: u64, tumor_depth: u64) {
        self.segment = Some(RunningSegment {
            chrom: pos.chrom.clone(),
            start: pos.pos,
            stop: pos.pos,
            depth_normal: normal_depth,
            depth_tumor: tumor_depth,
            sum_normal: normal_depth,
            sum_tumor: tumor_depth,
            positions: 1,
            gc_positions: if is_gc(pos.ref_base) { 1 } else { 0 },
        });
    }

    fn close_gap(&mut self) -> Option<RunningSegment> {
        let closed = self.close_if_qualifying();
        self.segment = None;
        closed
    }

    fn close_if_qualifying(&mut self) -> Option<RunningSegment> {
        match self.segment.take() {
            Some(seg) if seg.positions >= self.config.min_segment_size => Some(seg),
            _ => None,
        }
    }
}
