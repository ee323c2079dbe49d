use std::io::Write;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::die_pipeline::classify::{OutlierRanking, Reading};
use crate::die_pipeline::common::{BitMatrix, CancelFlag};
use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::export::{self, dump, merge};
use crate::die_pipeline::geometry::CalibrationDescriptor;
use crate::die_pipeline::photo::{AutoReader, Photograph, PhotoReader, RgbImageData};
use crate::die_pipeline::pipeline::config::ReadConfig;
use crate::die_pipeline::pipeline::timing::PipelineTimings;
use crate::die_pipeline::report::{ReportWriter, StandardTiffReportWriter, cell_positions, render_overlay};

/// Outcome of a read: the bits after overrides and what led to them.
#[derive(Debug, Clone)]
pub struct RomRead {
    pub bits: BitMatrix,
    /// Classifier output before overrides (merged, for a combined read).
    pub raw_bits: BitMatrix,
    /// Rankings of the photographs that were clustered, in read order.
    pub rankings: Vec<OutlierRanking>,
    /// Cells whose value an override changed.
    pub overridden: usize,
    /// Cells the two photographs of a combined read classified differently.
    pub disagreements: Vec<(usize, usize)>,
}

pub struct RomReadPipeline<R: PhotoReader, W: ReportWriter> {
    reader: R,
    writer: W,
    config: ReadConfig,
    cancel: CancelFlag,
}

impl RomReadPipeline<AutoReader, StandardTiffReportWriter> {
    pub fn new(config: ReadConfig) -> Self {
        Self::with_custom(AutoReader, StandardTiffReportWriter, config)
    }
}

impl<R: PhotoReader, W: ReportWriter> RomReadPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: ReadConfig) -> Self {
        Self { reader, writer, config, cancel: CancelFlag::new() }
    }

    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ReadConfig) {
        self.config = config;
    }

    /// Handle for stopping a read from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Loads the photograph and derives its feature map.
    pub fn load(&self, descriptor: &CalibrationDescriptor) -> Result<Photograph> {
        Photograph::load_with(&self.reader, descriptor, self.config.validate_dimensions)
    }

    fn decode(&self, descriptor: &CalibrationDescriptor) -> Result<RgbImageData> {
        Photograph::read_rgb(&self.reader, descriptor, self.config.validate_dimensions)
    }

    /// Classifies every cell with the configured strategy; no overrides.
    pub fn classify(&self, photo: &Photograph) -> Result<Reading> {
        let _span = tracing::info_span!("classify", strategy = self.config.strategy.name()).entered();
        self.config.strategy.read(photo, &self.cancel)
    }

    fn load_and_classify(&self, descriptor: &CalibrationDescriptor, timings: &mut PipelineTimings) -> Result<Reading> {
        let rgb = timings.time("load", || self.decode(descriptor))?;
        let photo = timings.time("feature", || Photograph::from_rgb(descriptor.clone(), rgb));
        timings.time("classify", || self.classify(&photo))
    }

    fn apply_overrides(&self, raw_bits: BitMatrix, rankings: Vec<OutlierRanking>, timings: &mut PipelineTimings) -> Result<RomRead> {
        let mut bits = raw_bits.clone();
        let overridden = timings.time("overrides", || self.config.overrides.apply(&mut bits))?;
        Ok(RomRead { bits, raw_bits, rankings, overridden, disagreements: Vec::new() })
    }

    #[instrument(skip(self, descriptor), fields(photo = %descriptor.name))]
    pub fn read_photo(&self, descriptor: &CalibrationDescriptor) -> Result<RomRead> {
        self.read_photo_with_timings(descriptor).map(|(read, _)| read)
    }

    pub fn read_photo_with_timings(&self, descriptor: &CalibrationDescriptor) -> Result<(RomRead, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        info!(strategy = self.config.strategy.name(), "Reading photograph");

        let reading = self.load_and_classify(descriptor, &mut timings)?;
        let read = self.apply_overrides(reading.bits, reading.ranking.into_iter().collect(), &mut timings)?;

        info!(
            ones = read.bits.count_ones(),
            overridden = read.overridden,
            "Read complete in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );
        Ok((read, timings))
    }

    /// Reads two photographs of the same array, takes rows `[0, split_row)`
    /// from `top` and the rest from `bottom`, then applies the overrides to
    /// the merged matrix.
    #[instrument(skip(self, top, bottom), fields(top = %top.name, bottom = %bottom.name))]
    pub fn combine(&self, top: &CalibrationDescriptor, bottom: &CalibrationDescriptor, split_row: usize) -> Result<RomRead> {
        self.combine_with_timings(top, bottom, split_row).map(|(read, _)| read)
    }

    pub fn combine_with_timings(
        &self,
        top: &CalibrationDescriptor,
        bottom: &CalibrationDescriptor,
        split_row: usize,
    ) -> Result<(RomRead, PipelineTimings)> {
        if top.lattice != bottom.lattice {
            return Err(ReadError::DimensionMismatch {
                left: (top.lattice.rows, top.lattice.cols),
                right: (bottom.lattice.rows, bottom.lattice.cols),
            });
        }
        if split_row > top.lattice.rows {
            return Err(ReadError::InvalidSplit { split_row, rows: top.lattice.rows });
        }

        let mut timings = PipelineTimings::new();
        let top_reading = self.load_and_classify(top, &mut timings)?;
        let bottom_reading = self.load_and_classify(bottom, &mut timings)?;

        let disagreements = top_reading.bits.diff(&bottom_reading.bits).unwrap_or_default();
        info!("Photographs disagree on {} cells", disagreements.len());

        let merged = timings.time("merge", || merge(&top_reading.bits, &bottom_reading.bits, split_row))?;
        let rankings = top_reading.ranking.into_iter().chain(bottom_reading.ranking).collect();
        let mut read = self.apply_overrides(merged, rankings, &mut timings)?;
        read.disagreements = disagreements;

        info!(
            split_row,
            overridden = read.overridden,
            "Combined read complete in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );
        Ok((read, timings))
    }

    pub fn dump(&self, bits: &BitMatrix) -> String {
        let layout = self.config.dump_layout;
        if bits.rows() % layout.group_rows.max(1) != 0 {
            warn!(rows = bits.rows(), group_rows = layout.group_rows, "Trailing rows do not fill a word group");
        }
        dump(bits, layout)
    }

    pub fn write_dump<P: AsRef<Path>>(&self, bits: &BitMatrix, path: P) -> Result<()> {
        export::write_dump(bits, self.config.dump_layout, path)
    }

    /// [`dump`](Self::dump), recorded as the `dump` stage.
    pub fn dump_with_timings(&self, bits: &BitMatrix, timings: &mut PipelineTimings) -> String {
        timings.time("dump", || self.dump(bits))
    }

    /// [`write_dump`](Self::write_dump), recorded as the `dump` stage.
    pub fn write_dump_with_timings<P: AsRef<Path>>(&self, bits: &BitMatrix, path: P, timings: &mut PipelineTimings) -> Result<()> {
        timings.time("dump", || self.write_dump(bits, path))
    }

    pub fn write_feature_tiff(&self, photo: &Photograph, output: &mut dyn Write) -> Result<()> {
        let _span = tracing::info_span!("encode_feature_tiff").entered();
        self.writer.write_feature_map(photo.feature(), output, self.config.compression)
    }

    /// Renders the photograph with every cell holding `value` marked.
    pub fn write_overlay_tiff(&self, photo: &Photograph, bits: &BitMatrix, value: bool, output: &mut dyn Write) -> Result<()> {
        let _span = tracing::info_span!("encode_overlay_tiff", value).entered();
        let points = cell_positions(photo.descriptor(), bits, value)?;
        let color = if value { [255, 64, 0] } else { [0, 160, 255] };
        let image = render_overlay(photo, &points, color);
        self.writer.write_overlay(&image, output, self.config.compression)
    }

    /// Loads the photograph and writes its feature map to `output_path`.
    #[instrument(skip(self, descriptor, output_path), fields(photo = %descriptor.name))]
    pub fn feature_file<P: AsRef<Path>>(&self, descriptor: &CalibrationDescriptor, output_path: P) -> Result<()> {
        let output_path = output_path.as_ref();
        let photo = self.load(descriptor)?;
        let mut output = std::fs::File::create(output_path)
            .map_err(|e| ReadError::EncodeError(format!("{}: {}", output_path.display(), e)))?;
        self.write_feature_tiff(&photo, &mut output)?;
        info!(output = %output_path.display(), "Wrote feature map");
        Ok(())
    }
}
