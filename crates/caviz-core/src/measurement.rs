use ndarray::Array2;
use tracing::debug;

use crate::error::{CavizError, Result};
use crate::frame::{fit_to_shape, Diagnostic, Frame, Mask, Movie, Stimulus};

/// One recording: raw and processed movies plus their timing metadata.
#[derive(Clone, Debug)]
pub struct Measurement {
    pub raw: Movie,
    pub signal: Movie,
    /// Pixels belonging to the imaged tissue. `None` selects every pixel.
    pub area: Option<Array2<bool>>,
    /// Static reference image. `None` falls back to the raw temporal mean.
    pub reference: Option<Frame>,
    pub sampling_period_ms: f64,
    pub stimuli: Vec<Stimulus>,
    /// Notes from adapting inputs, e.g. a resampled area mask.
    pub diagnostics: Vec<Diagnostic>,
}

impl Measurement {
    /// Raw and signal must share the same (X, Y, T) shape.
    pub fn new(raw: Movie, signal: Movie, sampling_period_ms: f64) -> Result<Self> {
        if raw.data.dim() != signal.data.dim() {
            return Err(CavizError::ShapeMismatch(format!(
                "raw {:?} vs signal {:?}",
                raw.data.dim(),
                signal.data.dim()
            )));
        }
        if raw.nt() == 0 {
            return Err(CavizError::EmptySequence);
        }
        Ok(Self {
            raw,
            signal,
            area: None,
            reference: None,
            sampling_period_ms,
            stimuli: Vec::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Render the raw data directly, using it as its own signal.
    pub fn from_raw(raw: Movie, sampling_period_ms: f64) -> Result<Self> {
        let signal = raw.clone();
        Self::new(raw, signal, sampling_period_ms)
    }

    /// Attach an area mask, resampling it when its shape differs.
    pub fn with_area(mut self, area: Array2<bool>) -> Self {
        let (fitted, diag) = fit_to_shape(&area, self.nx(), self.ny(), "area mask");
        self.diagnostics.extend(diag);
        self.area = Some(fitted);
        self
    }

    /// Attach a reference image, resampling it when its shape differs.
    pub fn with_reference(mut self, reference: Frame) -> Self {
        let (fitted, diag) = fit_to_shape(&reference, self.nx(), self.ny(), "reference image");
        self.diagnostics.extend(diag);
        self.reference = Some(fitted);
        self
    }

    pub fn with_stimuli(mut self, stimuli: Vec<Stimulus>) -> Self {
        self.stimuli = stimuli;
        self
    }

    pub fn nx(&self) -> usize {
        self.raw.nx()
    }

    pub fn ny(&self) -> usize {
        self.raw.ny()
    }

    pub fn nt(&self) -> usize {
        self.raw.nt()
    }

    /// The static reference image.
    pub fn baseline(&self) -> Frame {
        match &self.reference {
            Some(r) => r.clone(),
            None => {
                debug!("No reference image, using raw temporal mean");
                self.raw.temporal_mean()
            }
        }
    }

    /// The area mask, all-true when none was given.
    pub fn area_mask(&self) -> Mask {
        match &self.area {
            Some(a) => Mask::Static(a.clone()),
            None => Mask::all(self.nx(), self.ny()),
        }
    }
}
