//! `NIfTI` header parsing and construction.
//!
//! Templates may be NIfTI-1 (348-byte header) or NIfTI-2 (540-byte header),
//! in either byte order. Output datasets are always written as little-endian
//! NIfTI-1 single files.

use crate::error::{Error, Result};
use crate::geometry::GridGeometry;
use crate::grid::DatumType;
use crate::template::DatasetKind;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// NIfTI format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NiftiVersion {
    /// NIfTI-1 format (348-byte header, 16-bit dimensions)
    #[default]
    Nifti1,
    /// NIfTI-2 format (540-byte header, 64-bit dimensions)
    Nifti2,
}

impl NiftiVersion {
    /// Header size in bytes for this version.
    pub const fn header_size(self) -> usize {
        match self {
            Self::Nifti1 => 348,
            Self::Nifti2 => 540,
        }
    }

    /// Default vox_offset for this version (header size + extension flag).
    pub const fn default_vox_offset(self) -> i64 {
        match self {
            Self::Nifti1 => 352,
            Self::Nifti2 => 544,
        }
    }
}

/// NIfTI-1 header field byte offsets.
mod offsets_v1 {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM: usize = 40;
    pub const INTENT_CODE: usize = 68;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const XYZT_UNITS: usize = 123;
    pub const DESCRIP: usize = 148;
    pub const QFORM_CODE: usize = 252;
    pub const SFORM_CODE: usize = 254;
    pub const QUATERN_B: usize = 256;
    pub const QOFFSET_X: usize = 268;
    pub const SROW_X: usize = 280;
    pub const SROW_Y: usize = 296;
    pub const SROW_Z: usize = 312;
    pub const MAGIC: usize = 344;
}

/// NIfTI-2 header field byte offsets (read side only).
mod offsets_v2 {
    pub const MAGIC: usize = 4;
    pub const DATATYPE: usize = 12;
    pub const BITPIX: usize = 14;
    pub const DIM: usize = 16;
    pub const PIXDIM: usize = 104;
    pub const VOX_OFFSET: usize = 168;
    pub const SCL_SLOPE: usize = 176;
    pub const SCL_INTER: usize = 184;
    pub const DESCRIP: usize = 240;
    pub const QFORM_CODE: usize = 344;
    pub const SFORM_CODE: usize = 348;
    pub const QUATERN_B: usize = 352;
    pub const QOFFSET_X: usize = 376;
    pub const SROW_X: usize = 400;
    pub const SROW_Y: usize = 432;
    pub const SROW_Z: usize = 464;
    pub const XYZT_UNITS: usize = 500;
    pub const INTENT_CODE: usize = 504;
}

/// `NIfTI` data type codes.
///
/// Any of these may appear in a template; output grids use only
/// `UInt8`, `Int16` and `Float32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum DataType {
    /// Unsigned 8-bit integer
    UInt8 = 2,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Signed 32-bit integer
    Int32 = 8,
    /// 32-bit floating point
    Float32 = 16,
    /// 64-bit floating point
    Float64 = 64,
    /// Signed 8-bit integer
    Int8 = 256,
    /// Unsigned 16-bit integer
    UInt16 = 512,
    /// Unsigned 32-bit integer
    UInt32 = 768,
    /// Signed 64-bit integer
    Int64 = 1024,
    /// Unsigned 64-bit integer
    UInt64 = 1280,
}

impl DataType {
    /// Parse from `NIfTI` datatype code.
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            2 => Ok(Self::UInt8),
            4 => Ok(Self::Int16),
            8 => Ok(Self::Int32),
            16 => Ok(Self::Float32),
            64 => Ok(Self::Float64),
            256 => Ok(Self::Int8),
            512 => Ok(Self::UInt16),
            768 => Ok(Self::UInt32),
            1024 => Ok(Self::Int64),
            1280 => Ok(Self::UInt64),
            _ => Err(Error::UnsupportedDataType(code)),
        }
    }

    /// Size of each element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

/// Spatial units for voxel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialUnits {
    #[default]
    /// Units are not specified.
    Unknown,
    /// Voxel dimensions expressed in meters.
    Meter,
    /// Voxel dimensions expressed in millimeters.
    Millimeter,
    /// Voxel dimensions expressed in micrometers.
    Micrometer,
}

impl SpatialUnits {
    fn from_code(code: u8) -> Self {
        match code & 0x07 {
            1 => Self::Meter,
            2 => Self::Millimeter,
            3 => Self::Micrometer,
            _ => Self::Unknown,
        }
    }

    fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Meter => 1,
            Self::Millimeter => 2,
            Self::Micrometer => 3,
        }
    }

    /// Factor converting one unit into millimetres (unknown is taken as mm).
    pub const fn to_millimeters(self) -> f64 {
        match self {
            Self::Meter => 1000.0,
            Self::Micrometer => 0.001,
            Self::Millimeter | Self::Unknown => 1.0,
        }
    }
}

/// Transform code written for both qform and sform: scanner-anatomical.
const XFORM_SCANNER_ANAT: i32 = 1;

/// Unified NIfTI header.
///
/// Internally uses 64-bit dimensions and f64 precision to accommodate NIfTI-2.
#[derive(Debug, Clone)]
pub struct NiftiHeader {
    /// NIfTI format version.
    pub version: NiftiVersion,
    /// Number of dimensions (1-7).
    pub ndim: u8,
    /// Size along each dimension.
    pub dim: [i64; 7],
    /// Data type.
    pub datatype: DataType,
    /// qfac at index 0, voxel sizes at 1..=ndim.
    pub pixdim: [f64; 8],
    /// Data offset in file.
    pub vox_offset: i64,
    /// Data scaling slope.
    pub scl_slope: f64,
    /// Data scaling intercept.
    pub scl_inter: f64,
    /// Spatial units.
    pub spatial_units: SpatialUnits,
    /// Intent code.
    pub intent_code: i32,
    /// Description string.
    pub descrip: String,
    /// qform transform code.
    pub qform_code: i32,
    /// sform transform code.
    pub sform_code: i32,
    /// Quaternion parameters b, c, d.
    pub quatern: [f64; 3],
    /// qform translation.
    pub qoffset: [f64; 3],
    /// First row of the sform affine.
    pub srow_x: [f64; 4],
    /// Second row of the sform affine.
    pub srow_y: [f64; 4],
    /// Third row of the sform affine.
    pub srow_z: [f64; 4],
    /// File endianness (true = little endian).
    pub(crate) little_endian: bool,
}

impl Default for NiftiHeader {
    fn default() -> Self {
        Self {
            version: NiftiVersion::Nifti1,
            ndim: 3,
            dim: [1, 1, 1, 1, 1, 1, 1],
            datatype: DataType::Int16,
            pixdim: [1.0; 8],
            vox_offset: NiftiVersion::Nifti1.default_vox_offset(),
            scl_slope: 1.0,
            scl_inter: 0.0,
            spatial_units: SpatialUnits::Millimeter,
            intent_code: 0,
            descrip: String::new(),
            qform_code: 0,
            sform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow_x: [1.0, 0.0, 0.0, 0.0],
            srow_y: [0.0, 1.0, 0.0, 0.0],
            srow_z: [0.0, 0.0, 1.0, 0.0],
            little_endian: true,
        }
    }
}

impl NiftiHeader {
    /// Size of NIfTI-1 header in bytes.
    pub const SIZE: usize = 348;

    /// Size of NIfTI-2 header in bytes.
    pub const SIZE_V2: usize = 540;

    /// Header for a single-frame 3D grid with the given geometry and datum.
    ///
    /// Fails if a dimension does not fit the 16-bit NIfTI-1 limit.
    pub fn for_grid(geometry: &GridGeometry, datum: DatumType, kind: DatasetKind) -> Result<Self> {
        let dims = geometry.dims();
        if let Some(&too_big) = dims.iter().find(|&&d| d > i16::MAX as usize) {
            return Err(Error::InvalidDimensions(format!(
                "dimension {} exceeds the NIfTI-1 limit of {}",
                too_big,
                i16::MAX
            )));
        }

        let mut header = Self {
            ndim: 3,
            dim: [dims[0] as i64, dims[1] as i64, dims[2] as i64, 1, 1, 1, 1],
            datatype: datum.nifti_type(),
            descrip: format!("undump {}", kind.label()),
            ..Default::default()
        };
        header.set_affine_f64(geometry.ras_affine());
        header.validate()?;
        Ok(header)
    }

    /// Read header from bytes with automatic version and endianness detection.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "header too short to detect version",
            )));
        }

        let sizeof_hdr_le = LittleEndian::read_i32(&bytes[0..4]);
        let sizeof_hdr_be = BigEndian::read_i32(&bytes[0..4]);

        let (version, little_endian) = match (sizeof_hdr_le, sizeof_hdr_be) {
            (348, _) => (NiftiVersion::Nifti1, true),
            (_, 348) => (NiftiVersion::Nifti1, false),
            (540, _) => (NiftiVersion::Nifti2, true),
            (_, 540) => (NiftiVersion::Nifti2, false),
            _ => {
                return Err(Error::InvalidMagic([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ]))
            }
        };

        let required_size = version.header_size();
        if bytes.len() < required_size {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "header too short: got {} bytes, need {} for {:?}",
                    bytes.len(),
                    required_size,
                    version
                ),
            )));
        }

        match (version, little_endian) {
            (NiftiVersion::Nifti1, true) => Self::parse_v1::<LittleEndian>(bytes, true),
            (NiftiVersion::Nifti1, false) => Self::parse_v1::<BigEndian>(bytes, false),
            (NiftiVersion::Nifti2, true) => Self::parse_v2::<LittleEndian>(bytes, true),
            (NiftiVersion::Nifti2, false) => Self::parse_v2::<BigEndian>(bytes, false),
        }
    }

    #[allow(clippy::wildcard_imports)]
    fn parse_v1<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Result<Self> {
        use offsets_v1::*;

        let magic = &bytes[MAGIC..MAGIC + 4];
        if magic != b"n+1\0" && magic != b"ni1\0" {
            return Err(Error::InvalidMagic([
                magic[0], magic[1], magic[2], magic[3],
            ]));
        }

        let ndim = checked_ndim(i64::from(E::read_i16(&bytes[DIM..DIM + 2])))?;
        let mut dim = [0i64; 7];
        for (i, slot) in dim.iter_mut().enumerate() {
            let offset = DIM + 2 + i * 2;
            *slot = i64::from(E::read_i16(&bytes[offset..offset + 2]));
        }

        let datatype = DataType::from_code(E::read_i16(&bytes[DATATYPE..DATATYPE + 2]))?;
        check_bitpix(datatype, E::read_i16(&bytes[BITPIX..BITPIX + 2]))?;

        let read_f32 = |offset: usize| f64::from(E::read_f32(&bytes[offset..offset + 4]));
        let mut pixdim = [0.0f64; 8];
        for (i, slot) in pixdim.iter_mut().enumerate() {
            *slot = read_f32(PIXDIM + i * 4);
        }

        let vox_offset = read_f32(VOX_OFFSET);
        if !vox_offset.is_finite() || vox_offset.fract() != 0.0 {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset must be a finite integer, got {}",
                vox_offset
            )));
        }

        let header = Self {
            version: NiftiVersion::Nifti1,
            ndim,
            dim,
            datatype,
            pixdim,
            vox_offset: vox_offset as i64,
            scl_slope: read_f32(SCL_SLOPE),
            scl_inter: read_f32(SCL_INTER),
            spatial_units: SpatialUnits::from_code(bytes[XYZT_UNITS]),
            intent_code: i32::from(E::read_i16(&bytes[INTENT_CODE..INTENT_CODE + 2])),
            descrip: read_string(&bytes[DESCRIP..DESCRIP + 80]),
            qform_code: i32::from(E::read_i16(&bytes[QFORM_CODE..QFORM_CODE + 2])),
            sform_code: i32::from(E::read_i16(&bytes[SFORM_CODE..SFORM_CODE + 2])),
            quatern: [0, 1, 2].map(|n| read_f32(QUATERN_B + n * 4)),
            qoffset: [0, 1, 2].map(|n| read_f32(QOFFSET_X + n * 4)),
            srow_x: [0, 1, 2, 3].map(|n| read_f32(SROW_X + n * 4)),
            srow_y: [0, 1, 2, 3].map(|n| read_f32(SROW_Y + n * 4)),
            srow_z: [0, 1, 2, 3].map(|n| read_f32(SROW_Z + n * 4)),
            little_endian,
        };

        header.validate()?;
        Ok(header)
    }

    #[allow(clippy::wildcard_imports)]
    fn parse_v2<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Result<Self> {
        use offsets_v2::*;

        let magic = &bytes[MAGIC..MAGIC + 8];
        if magic != b"n+2\0\r\n\x1a\n" && magic != b"ni2\0\r\n\x1a\n" {
            return Err(Error::InvalidMagic([
                magic[0], magic[1], magic[2], magic[3],
            ]));
        }

        let ndim = checked_ndim(E::read_i64(&bytes[DIM..DIM + 8]))?;
        let mut dim = [0i64; 7];
        for (i, slot) in dim.iter_mut().enumerate() {
            let offset = DIM + 8 + i * 8;
            *slot = E::read_i64(&bytes[offset..offset + 8]);
        }

        let datatype = DataType::from_code(E::read_i16(&bytes[DATATYPE..DATATYPE + 2]))?;
        check_bitpix(datatype, E::read_i16(&bytes[BITPIX..BITPIX + 2]))?;

        let read_f64 = |offset: usize| E::read_f64(&bytes[offset..offset + 8]);
        let mut pixdim = [0.0f64; 8];
        for (i, slot) in pixdim.iter_mut().enumerate() {
            *slot = read_f64(PIXDIM + i * 8);
        }

        let xyzt_units = E::read_i32(&bytes[XYZT_UNITS..XYZT_UNITS + 4]) as u8;

        let header = Self {
            version: NiftiVersion::Nifti2,
            ndim,
            dim,
            datatype,
            pixdim,
            vox_offset: E::read_i64(&bytes[VOX_OFFSET..VOX_OFFSET + 8]),
            scl_slope: read_f64(SCL_SLOPE),
            scl_inter: read_f64(SCL_INTER),
            spatial_units: SpatialUnits::from_code(xyzt_units),
            intent_code: E::read_i32(&bytes[INTENT_CODE..INTENT_CODE + 4]),
            descrip: read_string(&bytes[DESCRIP..DESCRIP + 80]),
            qform_code: E::read_i32(&bytes[QFORM_CODE..QFORM_CODE + 4]),
            sform_code: E::read_i32(&bytes[SFORM_CODE..SFORM_CODE + 4]),
            quatern: [0, 1, 2].map(|n| read_f64(QUATERN_B + n * 8)),
            qoffset: [0, 1, 2].map(|n| read_f64(QOFFSET_X + n * 8)),
            srow_x: [0, 1, 2, 3].map(|n| read_f64(SROW_X + n * 8)),
            srow_y: [0, 1, 2, 3].map(|n| read_f64(SROW_Y + n * 8)),
            srow_z: [0, 1, 2, 3].map(|n| read_f64(SROW_Z + n * 8)),
            little_endian,
        };

        header.validate()?;
        Ok(header)
    }

    /// Encode as a little-endian NIfTI-1 header.
    #[allow(clippy::wildcard_imports)]
    pub fn to_bytes(&self) -> Vec<u8> {
        use offsets_v1::*;

        fn put_f32(buf: &mut [u8], offset: usize, v: f64) {
            LittleEndian::write_f32(&mut buf[offset..offset + 4], v as f32);
        }

        let mut buf = vec![0u8; Self::SIZE];

        LittleEndian::write_i32(&mut buf[SIZEOF_HDR..SIZEOF_HDR + 4], Self::SIZE as i32);

        LittleEndian::write_i16(&mut buf[DIM..DIM + 2], i16::from(self.ndim));
        for (i, &d) in self.dim.iter().enumerate() {
            let offset = DIM + 2 + i * 2;
            LittleEndian::write_i16(&mut buf[offset..offset + 2], d.min(i16::MAX as i64) as i16);
        }

        LittleEndian::write_i16(&mut buf[INTENT_CODE..INTENT_CODE + 2], self.intent_code as i16);
        LittleEndian::write_i16(&mut buf[DATATYPE..DATATYPE + 2], self.datatype as i16);
        LittleEndian::write_i16(
            &mut buf[BITPIX..BITPIX + 2],
            (self.datatype.byte_size() * 8) as i16,
        );

        for (i, &v) in self.pixdim.iter().enumerate() {
            put_f32(&mut buf, PIXDIM + i * 4, v);
        }
        put_f32(&mut buf, VOX_OFFSET, self.vox_offset as f64);
        put_f32(&mut buf, SCL_SLOPE, self.scl_slope);
        put_f32(&mut buf, SCL_INTER, self.scl_inter);

        buf[XYZT_UNITS] = self.spatial_units.to_code();

        let descrip = self.descrip.as_bytes();
        let len = descrip.len().min(79);
        buf[DESCRIP..DESCRIP + len].copy_from_slice(&descrip[..len]);

        LittleEndian::write_i16(&mut buf[QFORM_CODE..QFORM_CODE + 2], self.qform_code as i16);
        LittleEndian::write_i16(&mut buf[SFORM_CODE..SFORM_CODE + 2], self.sform_code as i16);

        for n in 0..3 {
            put_f32(&mut buf, QUATERN_B + n * 4, self.quatern[n]);
            put_f32(&mut buf, QOFFSET_X + n * 4, self.qoffset[n]);
        }
        for n in 0..4 {
            put_f32(&mut buf, SROW_X + n * 4, self.srow_x[n]);
            put_f32(&mut buf, SROW_Y + n * 4, self.srow_y[n]);
            put_f32(&mut buf, SROW_Z + n * 4, self.srow_z[n]);
        }

        buf[MAGIC..MAGIC + 4].copy_from_slice(b"n+1\0");

        buf
    }

    /// 4x4 voxel-to-world affine (sform, else qform, else pixdim scaling).
    pub fn affine_f64(&self) -> [[f64; 4]; 4] {
        if self.sform_code > 0 {
            [self.srow_x, self.srow_y, self.srow_z, [0.0, 0.0, 0.0, 1.0]]
        } else if self.qform_code > 0 {
            self.qform_to_affine_f64()
        } else {
            [
                [self.pixdim[1], 0.0, 0.0, 0.0],
                [0.0, self.pixdim[2], 0.0, 0.0],
                [0.0, 0.0, self.pixdim[3], 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]
        }
    }

    /// Store `affine` as the sform and as an equivalent qform.
    ///
    /// The rotation part must be orthogonal up to column scaling, which holds
    /// for every grid geometry this crate produces.
    pub fn set_affine_f64(&mut self, affine: [[f64; 4]; 4]) {
        self.srow_x = affine[0];
        self.srow_y = affine[1];
        self.srow_z = affine[2];
        self.sform_code = XFORM_SCANNER_ANAT;

        let mut rotation = [[0.0f64; 3]; 3];
        for col in 0..3 {
            let norm = (0..3)
                .map(|row| affine[row][col] * affine[row][col])
                .sum::<f64>()
                .sqrt();
            self.pixdim[col + 1] = norm;
            for row in 0..3 {
                rotation[row][col] = if norm > 0.0 { affine[row][col] / norm } else { 0.0 };
            }
        }

        let qfac = if determinant(&rotation) < 0.0 { -1.0 } else { 1.0 };
        if qfac < 0.0 {
            for row in &mut rotation {
                row[2] = -row[2];
            }
        }

        self.pixdim[0] = qfac;
        self.quatern = rotation_to_quatern(&rotation);
        self.qoffset = [affine[0][3], affine[1][3], affine[2][3]];
        self.qform_code = XFORM_SCANNER_ANAT;
    }

    #[allow(clippy::many_single_char_names)]
    fn qform_to_affine_f64(&self) -> [[f64; 4]; 4] {
        let [b, c, d] = self.quatern;
        let a = (1.0 - b * b - c * c - d * d).max(0.0).sqrt();

        let qfac = if self.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let [i, j, k] = [self.pixdim[1].abs(), self.pixdim[2], self.pixdim[3] * qfac];

        [
            [
                (a * a + b * b - c * c - d * d) * i,
                2.0 * (b * c - a * d) * j,
                2.0 * (b * d + a * c) * k,
                self.qoffset[0],
            ],
            [
                2.0 * (b * c + a * d) * i,
                (a * a - b * b + c * c - d * d) * j,
                2.0 * (c * d - a * b) * k,
                self.qoffset[1],
            ],
            [
                2.0 * (b * d - a * c) * i,
                2.0 * (c * d + a * b) * j,
                (a * a - b * b - c * c + d * d) * k,
                self.qoffset[2],
            ],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    /// First three dimensions, padding missing ones with 1.
    pub fn spatial_dims(&self) -> [usize; 3] {
        let mut dims = [1usize; 3];
        for (n, slot) in dims.iter_mut().enumerate().take(self.ndim as usize) {
            *slot = self.dim[n] as usize;
        }
        dims
    }

    /// Returns true if file is little endian.
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Validate header fields for basic NIfTI invariants.
    ///
    /// Spatial pixdim is only checked when the affine falls back on it (no
    /// sform); a zero time step is common in templates and irrelevant here.
    pub fn validate(&self) -> Result<()> {
        if self.ndim == 0 || self.ndim > 7 {
            return Err(Error::InvalidDimensions(format!(
                "ndim must be 1..=7, got {}",
                self.ndim
            )));
        }

        for i in 0..self.ndim as usize {
            if self.dim[i] <= 0 {
                return Err(Error::InvalidDimensions(format!(
                    "dimension {} must be positive, got {}",
                    i, self.dim[i]
                )));
            }
        }

        let spatial_pixdim = if self.sform_code > 0 {
            0
        } else {
            (self.ndim as usize).min(3)
        };
        for i in 0..spatial_pixdim {
            let spacing = self.pixdim[i + 1];
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(Error::InvalidDimensions(format!(
                    "pixdim[{}] must be finite and > 0, got {}",
                    i + 1,
                    spacing
                )));
            }
        }

        let min_offset = self.version.header_size() as i64;
        if self.vox_offset < min_offset {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset {} before header end ({})",
                self.vox_offset, min_offset
            )));
        }

        let mut voxels: usize = 1;
        for i in 0..self.ndim as usize {
            voxels = voxels
                .checked_mul(self.dim[i] as usize)
                .ok_or_else(|| Error::InvalidDimensions("dimension product overflow".into()))?;
        }
        voxels
            .checked_mul(self.datatype.byte_size())
            .ok_or_else(|| Error::InvalidDimensions("data size overflow".into()))?;

        Ok(())
    }
}

fn checked_ndim(raw: i64) -> Result<u8> {
    if (1..=7).contains(&raw) {
        Ok(raw as u8)
    } else {
        Err(Error::InvalidDimensions(format!(
            "ndim must be 1..=7, got {}",
            raw
        )))
    }
}

fn check_bitpix(datatype: DataType, bitpix: i16) -> Result<()> {
    let expected = (datatype.byte_size() * 8) as i16;
    if bitpix == expected {
        Ok(())
    } else {
        Err(Error::InvalidDimensions(format!(
            "bitpix {} does not match datatype {:?} (expected {})",
            bitpix,
            datatype,
            expected
        )))
    }
}

fn read_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

fn determinant(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Quaternion (b, c, d) of a proper rotation matrix, with a >= 0.
#[allow(clippy::many_single_char_names)]
fn rotation_to_quatern(r: &[[f64; 3]; 3]) -> [f64; 3] {
    let trace = r[0][0] + r[1][1] + r[2][2] + 1.0;
    let (a, b, c, d);
    if trace > 0.5 {
        a = 0.5 * trace.sqrt();
        b = 0.25 * (r[2][1] - r[1][2]) / a;
        c = 0.25 * (r[0][2] - r[2][0]) / a;
        d = 0.25 * (r[1][0] - r[0][1]) / a;
    } else {
        let xd = 1.0 + r[0][0] - (r[1][1] + r[2][2]);
        let yd = 1.0 + r[1][1] - (r[0][0] + r[2][2]);
        let zd = 1.0 + r[2][2] - (r[0][0] + r[1][1]);
        if xd > 1.0 {
            b = 0.5 * xd.sqrt();
            c = 0.25 * (r[0][1] + r[1][0]) / b;
            d = 0.25 * (r[0][2] + r[2][0]) / b;
            a = 0.25 * (r[2][1] - r[1][2]) / b;
        } else if yd > 1.0 {
            c = 0.5 * yd.sqrt();
            b = 0.25 * (r[0][1] + r[1][0]) / c;
            d = 0.25 * (r[1][2] + r[2][1]) / c;
            a = 0.25 * (r[0][2] - r[2][0]) / c;
        } else {
            d = 0.5 * zd.sqrt();
            b = 0.25 * (r[0][2] + r[2][0]) / d;
            c = 0.25 * (r[1][2] + r[2][1]) / d;
            a = 0.25 * (r[1][0] - r[0][1]) / d;
        }
    }

    if a < 0.0 {
        [-b, -c, -d]
    } else {
        [b, c, d]
    }
}
