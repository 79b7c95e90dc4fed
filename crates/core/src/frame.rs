//! Per-frame coordinate container.

/// One snapshot of all particle positions.
///
/// Transformations mutate `positions` in place and leave everything else
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Frame number within its trajectory.
    pub index: usize,
    /// Cartesian positions, one entry per atom.
    pub positions: Vec<[f64; 3]>,
    /// Orthorhombic box lengths, if the system is periodic.
    pub dimensions: Option<[f64; 3]>,
}

impl Frame {
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        Self {
            index: 0,
            positions,
            dimensions: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_dimensions(mut self, dimensions: [f64; 3]) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }

    /// Shift every position in the frame by `vector`.
    pub fn translate(&mut self, vector: &[f64; 3]) {
        for p in self.positions.iter_mut() {
            p[0] += vector[0];
            p[1] += vector[1];
            p[2] += vector[2];
        }
    }
}
