//! WKB reading operations.

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};

use super::{EWKB_SRID_FLAG, WKB_BE, WKB_LE, WKB_MULTIPOLYGON, WKB_POLYGON};

/// Cursor over WKB bytes that honours the byte order of the current geometry.
struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Self { Self { bytes, pos: 0, little_endian: true } }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end)
            .ok_or_else(|| anyhow!("[io::wkb::read] Unexpected end of input at byte {}", self.pos))?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take::<4>()?;
        Ok(if self.little_endian { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take::<8>()?;
        Ok(if self.little_endian { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) })
    }

    /// Read a byte-order marker and a geometry type, skipping an EWKB SRID.
    fn read_header(&mut self) -> Result<u32> {
        self.little_endian = match self.take::<1>()?[0] {
            WKB_LE => true,
            WKB_BE => false,
            other => bail!("[io::wkb::read] Invalid byte order marker {other}"),
        };
        let raw_type = self.read_u32().context("[io::wkb::read] Failed to read geometry type")?;
        if raw_type & EWKB_SRID_FLAG != 0 {
            self.read_u32().context("[io::wkb::read] Failed to read SRID")?;
        }
        let geom_type = raw_type & !EWKB_SRID_FLAG;
        if geom_type > 7 {
            bail!("[io::wkb::read] Only 2D geometries are supported, got type {raw_type:#x}");
        }
        Ok(geom_type)
    }

    fn read_ring(&mut self) -> Result<LineString<f64>> {
        let len = self.read_u32().context("[io::wkb::read] Failed to read ring length")? as usize;
        let mut coords = Vec::with_capacity(len.min(self.remaining() / 16));
        for _ in 0..len {
            let x = self.read_f64().context("[io::wkb::read] Failed to read x coordinate")?;
            let y = self.read_f64().context("[io::wkb::read] Failed to read y coordinate")?;
            coords.push(Coord { x, y });
        }
        Ok(LineString::new(coords))
    }

    fn read_polygon_body(&mut self) -> Result<Option<Polygon<f64>>> {
        let num_rings = self.read_u32().context("[io::wkb::read] Failed to read number of rings")?;
        if num_rings == 0 { return Ok(None) }

        let exterior = self.read_ring()?;
        let interiors = (1..num_rings).map(|_| self.read_ring()).collect::<Result<Vec<_>>>()?;
        Ok(Some(Polygon::new(exterior, interiors)))
    }

    #[inline] fn remaining(&self) -> usize { self.bytes.len().saturating_sub(self.pos) }
}

/// Decode a WKB or EWKB Polygon or MultiPolygon. Empty polygons decode to an
/// empty MultiPolygon.
pub fn multipolygon_from_wkb(bytes: &[u8]) -> Result<MultiPolygon<f64>> {
    let mut reader = WkbReader::new(bytes);
    let polygons = match reader.read_header()? {
        WKB_POLYGON => reader.read_polygon_body()?.into_iter().collect(),
        WKB_MULTIPOLYGON => {
            let count = reader.read_u32().context("[io::wkb::read] Failed to read polygon count")?;
            let mut polygons = Vec::new();
            for i in 0..count {
                let member_type = reader.read_header()
                    .with_context(|| format!("[io::wkb::read] Failed to read header of polygon {i}"))?;
                if member_type != WKB_POLYGON {
                    bail!("[io::wkb::read] MultiPolygon member {i} has geometry type {member_type}");
                }
                polygons.extend(reader.read_polygon_body()?);
            }
            polygons
        }
        other => bail!("[io::wkb::read] Expected Polygon or MultiPolygon geometry type, got {other}"),
    };

    if reader.remaining() != 0 {
        bail!("[io::wkb::read] {} trailing bytes after geometry", reader.remaining());
    }
    Ok(MultiPolygon::new(polygons))
}
