/// Why a scale-space extremum was dropped during refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Hessian determinant too small to solve
    Singular,
    /// Sub-pixel update moved too far
    Unstable,
    /// Edge-like principal curvature ratio
    Edge,
    /// Refined response under the Laplacian threshold
    LowContrast,
    /// Refined position outside the base image
    OutOfBounds,
}

/// Per-level scan counters, logged at debug level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub extrema: usize,
    pub singular: usize,
    pub unstable: usize,
    pub edge: usize,
    pub low_contrast: usize,
    pub out_of_bounds: usize,
    pub accepted: usize,
}

impl ScanStats {
    pub fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Singular => self.singular += 1,
            Rejection::Unstable => self.unstable += 1,
            Rejection::Edge => self.edge += 1,
            Rejection::LowContrast => self.low_contrast += 1,
            Rejection::OutOfBounds => self.out_of_bounds += 1,
        }
    }

    pub fn merge(&mut self, other: &ScanStats) {
        self.extrema += other.extrema;
        self.singular += other.singular;
        self.unstable += other.unstable;
        self.edge += other.edge;
        self.low_contrast += other.low_contrast;
        self.out_of_bounds += other.out_of_bounds;
        self.accepted += other.accepted;
    }
}

/// Half-open scan window `[start_x, end_x) x [start_y, end_y)` of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    pub start_x: usize,
    pub end_x: usize,
    pub start_y: usize,
    pub end_y: usize,
}

impl ScanBounds {
    /// Border exclusion for a level of `width x height`.
    ///
    /// One pixel normally. Next to an upsampled neighbour level two pixels
    /// at the start and three at the end are skipped, plus one more when that
    /// dimension was padded for odd size.
    pub fn new(width: usize, height: usize, upsampled: bool, pad_one_width: bool, pad_one_height: bool) -> Self {
        let start = if upsampled { 2 } else { 1 };
        let tail = if upsampled { 3 } else { 1 };
        let end_x = width.saturating_sub(tail + usize::from(pad_one_width));
        let end_y = height.saturating_sub(tail + usize::from(pad_one_height));
        Self {
            start_x: start,
            end_x,
            start_y: start,
            end_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_x >= self.end_x || self.start_y >= self.end_y
    }
}
