//! Bundled SRTM/NASADEM `.hgt` elevation provider.
//!
//! Implements [`ElevationSource`] for the plain big-endian `i16`
//! height files distributed by the USGS. Tile resolution is derived
//! from file length and the geographic origin from the file name
//! (e.g. `N44W072.hgt` is the tile whose southwest corner sits at
//! 44N, 72W). Samples are stored north-to-south, which matches the
//! row-major north-up convention of [`ElevationGrid`].
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

use crate::{ElevationGrid, ElevationSource, GeoTransform, GridError, NodataPolicy, C};
use byteorder::{BigEndian as BE, ByteOrder, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use ndarray::Array2;
use std::{fs::File, io::BufReader, mem::size_of, path::Path};

const ARCSEC_PER_DEG: C = 3600.0;

/// SRTM void sample. Well below [`crate::NODATA_FLOOR`], so the
/// default policy masks it.
pub const SRTM_VOID: i16 = -32768;

/// How to read tile bytes.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Parse the file and hold all samples in memory.
    InMem,
    /// Memory map the file contents.
    MemMap,
}

/// An [`ElevationSource`] for `.hgt` tiles.
#[derive(Debug, Clone, Copy)]
pub struct HgtReader(pub LoadMode);

impl ElevationSource for HgtReader {
    fn read(&self, path: &Path) -> Result<ElevationGrid, GridError> {
        let (resolution, (rows, cols)) = extract_resolution(path)?;
        let sw_corner = parse_sw_corner(path)?;

        let values = match self.0 {
            LoadMode::InMem => read_samples(path, rows * cols)?,
            LoadMode::MemMap => map_samples(path, rows * cols)?,
        };
        let values = Array2::from_shape_vec((rows, cols), values)
            .expect("sample count matches tile dimensions");

        let cell = C::from(resolution) / ARCSEC_PER_DEG;
        #[allow(clippy::cast_precision_loss)]
        let transform = GeoTransform::new(
            Coord {
                x: C::from(sw_corner.x),
                // Northernmost sample center is one tile height above
                // the southwest corner.
                y: C::from(sw_corner.y) + (rows - 1) as C * cell,
            },
            cell,
            -cell,
        );

        ElevationGrid::new(values, NodataPolicy::default(), Some(transform))
    }
}

fn read_samples(path: &Path, len: usize) -> Result<Vec<C>, GridError> {
    let mut file = BufReader::new(File::open(path)?);
    let mut samples = Vec::with_capacity(len);
    for _ in 0..len {
        samples.push(C::from(file.read_i16::<BE>()?));
    }
    Ok(samples)
}

fn map_samples(path: &Path, len: usize) -> Result<Vec<C>, GridError> {
    let file = File::open(path)?;
    let raw = unsafe { Mmap::map(&file)? };
    // The file may have been truncated since the length check.
    let raw = raw
        .get(..len * size_of::<i16>())
        .ok_or_else(|| GridError::HgtLen(raw.len() as u64, path.to_owned()))?;
    let mut samples = Vec::with_capacity(len);
    for bytes in raw.chunks_exact(size_of::<i16>()) {
        samples.push(C::from(BE::read_i16(bytes)));
    }
    Ok(samples)
}

fn extract_resolution(path: &Path) -> Result<(u8, (usize, usize)), GridError> {
    const RES_1_ARCSECOND_LEN: u64 = 3601 * 3601 * size_of::<u16>() as u64;
    const RES_3_ARCSECOND_LEN: u64 = 1201 * 1201 * size_of::<u16>() as u64;
    match path.metadata().map(|m| m.len())? {
        RES_1_ARCSECOND_LEN => Ok((1, (3601, 3601))),
        RES_3_ARCSECOND_LEN => Ok((3, (1201, 1201))),
        invalid_len => Err(GridError::HgtLen(invalid_len, path.to_owned())),
    }
}

fn parse_sw_corner(path: &Path) -> Result<Coord<i16>, GridError> {
    let mk_err = || GridError::HgtName(path.to_owned());
    let name = path
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" => 1,
        "S" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" => 1,
        "W" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
