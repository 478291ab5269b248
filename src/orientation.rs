//! Anatomical axis orientation codes.
//!
//! An orientation code is three letters, one from each of the pairs
//! `{R,L}`, `{A,P}` and `{I,S}`. The first letter is the direction of the x
//! axis, the second y, the third z:
//!
//! | letter | direction               |
//! |--------|-------------------------|
//! | `R`    | right-to-left           |
//! | `L`    | left-to-right           |
//! | `A`    | anterior-to-posterior   |
//! | `P`    | posterior-to-anterior   |
//! | `I`    | inferior-to-superior    |
//! | `S`    | superior-to-inferior    |
//!
//! The canonical space is `RAI`: x grows toward the left, y toward posterior,
//! z toward superior (LPS+). Every conversion between a caller's axis order
//! and a dataset's axes goes through it.

use crate::error::{Error, Result};

/// Opposite-direction axis pair. The discriminant is the canonical axis index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisFamily {
    /// Right/left.
    LeftRight = 0,
    /// Anterior/posterior.
    AnteriorPosterior = 1,
    /// Inferior/superior.
    InferiorSuperior = 2,
}

impl AxisFamily {
    /// Position of this family in canonical space.
    pub const fn canonical_index(self) -> usize {
        self as usize
    }

    /// Family stored at canonical index `n`.
    pub const fn from_canonical_index(n: usize) -> Option<Self> {
        match n {
            0 => Some(Self::LeftRight),
            1 => Some(Self::AnteriorPosterior),
            2 => Some(Self::InferiorSuperior),
            _ => None,
        }
    }

    /// Orientation of this family pointing in `sign` direction of canonical space.
    pub const fn with_sign(self, positive: bool) -> AxisOrientation {
        match (self, positive) {
            (Self::LeftRight, true) => AxisOrientation::RightToLeft,
            (Self::LeftRight, false) => AxisOrientation::LeftToRight,
            (Self::AnteriorPosterior, true) => AxisOrientation::AnteriorToPosterior,
            (Self::AnteriorPosterior, false) => AxisOrientation::PosteriorToAnterior,
            (Self::InferiorSuperior, true) => AxisOrientation::InferiorToSuperior,
            (Self::InferiorSuperior, false) => AxisOrientation::SuperiorToInferior,
        }
    }
}

/// Direction of one dataset or coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisOrientation {
    /// `R`
    RightToLeft,
    /// `L`
    LeftToRight,
    /// `P`
    PosteriorToAnterior,
    /// `A`
    AnteriorToPosterior,
    /// `I`
    InferiorToSuperior,
    /// `S`
    SuperiorToInferior,
}

impl AxisOrientation {
    /// All six directions.
    pub const ALL: [Self; 6] = [
        Self::RightToLeft,
        Self::LeftToRight,
        Self::PosteriorToAnterior,
        Self::AnteriorToPosterior,
        Self::InferiorToSuperior,
        Self::SuperiorToInferior,
    ];

    /// Parse a single orientation letter.
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'R' => Some(Self::RightToLeft),
            'L' => Some(Self::LeftToRight),
            'P' => Some(Self::PosteriorToAnterior),
            'A' => Some(Self::AnteriorToPosterior),
            'I' => Some(Self::InferiorToSuperior),
            'S' => Some(Self::SuperiorToInferior),
            _ => None,
        }
    }

    /// Letter naming the start of the axis.
    pub const fn letter(self) -> char {
        match self {
            Self::RightToLeft => 'R',
            Self::LeftToRight => 'L',
            Self::PosteriorToAnterior => 'P',
            Self::AnteriorToPosterior => 'A',
            Self::InferiorToSuperior => 'I',
            Self::SuperiorToInferior => 'S',
        }
    }

    /// Axis family this direction belongs to.
    pub const fn family(self) -> AxisFamily {
        match self {
            Self::RightToLeft | Self::LeftToRight => AxisFamily::LeftRight,
            Self::PosteriorToAnterior | Self::AnteriorToPosterior => AxisFamily::AnteriorPosterior,
            Self::InferiorToSuperior | Self::SuperiorToInferior => AxisFamily::InferiorSuperior,
        }
    }

    /// True if the axis points along the positive canonical direction.
    pub const fn is_positive(self) -> bool {
        matches!(
            self,
            Self::RightToLeft | Self::AnteriorToPosterior | Self::InferiorToSuperior
        )
    }

    /// `+1.0` or `-1.0` following [`Self::is_positive`].
    pub const fn sign(self) -> f64 {
        if self.is_positive() {
            1.0
        } else {
            -1.0
        }
    }
}

impl std::fmt::Display for AxisOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RightToLeft => "R-L",
            Self::LeftToRight => "L-R",
            Self::PosteriorToAnterior => "P-A",
            Self::AnteriorToPosterior => "A-P",
            Self::InferiorToSuperior => "I-S",
            Self::SuperiorToInferior => "S-I",
        };
        f.write_str(name)
    }
}

/// Validated three-axis orientation, one direction per x, y, z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientationCode([AxisOrientation; 3]);

impl OrientationCode {
    /// Canonical index order (`RAI`).
    pub const CANONICAL: Self = Self([
        AxisOrientation::RightToLeft,
        AxisOrientation::AnteriorToPosterior,
        AxisOrientation::InferiorToSuperior,
    ]);

    /// Build from three directions, checking that each family appears once.
    pub fn new(axes: [AxisOrientation; 3]) -> Result<Self> {
        let mut seen = [false; 3];
        for axis in axes {
            let slot = &mut seen[axis.family().canonical_index()];
            if *slot {
                let code: String = axes.iter().map(|a| a.letter()).collect();
                return Err(Error::InvalidOrientationCode(code));
            }
            *slot = true;
        }
        Ok(Self(axes))
    }

    /// Directions of the x, y and z axes.
    pub const fn axes(&self) -> [AxisOrientation; 3] {
        self.0
    }

    /// Direction of axis `n` (0 = x, 1 = y, 2 = z).
    pub const fn axis(&self, n: usize) -> AxisOrientation {
        self.0[n]
    }

    /// Convert a triple expressed in this axis order into canonical order.
    ///
    /// Each component is sign-adjusted so it grows along the canonical
    /// direction, then moved to its family's slot.
    pub fn to_canonical(&self, xyz: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (axis, value) in self.0.iter().zip(xyz) {
            out[axis.family().canonical_index()] = axis.sign() * value;
        }
        out
    }

    /// Inverse of [`Self::to_canonical`].
    pub fn from_canonical(&self, canonical: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (slot, axis) in out.iter_mut().zip(self.0.iter()) {
            *slot = axis.sign() * canonical[axis.family().canonical_index()];
        }
        out
    }
}

impl Default for OrientationCode {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl std::str::FromStr for OrientationCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidOrientationCode(s.to_string());
        let letters: Vec<char> = s.chars().collect();
        if letters.len() != 3 {
            return Err(invalid());
        }

        let mut axes = [AxisOrientation::RightToLeft; 3];
        for (slot, &letter) in axes.iter_mut().zip(&letters) {
            *slot = AxisOrientation::from_letter(letter).ok_or_else(invalid)?;
        }
        Self::new(axes).map_err(|_| invalid())
    }
}

impl std::fmt::Display for OrientationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}
