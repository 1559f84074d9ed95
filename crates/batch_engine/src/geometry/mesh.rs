//! Tessellated planes, boxes and spheres
//!
//! Each shape lays out a grid of positions and wires two triangles per grid
//! cell. A lookup table memoises the vertex index of every grid corner so
//! neighbouring cells share vertices instead of duplicating them. Shapes are
//! emitted into a single triangle batch; a shape that needs more vertices or
//! indices than one batch holds is rejected up front.

use crate::batch::{BatchError, BatchResult, TriangleBatch};
use crate::foundation::color::Color;
use crate::foundation::math::constants::{PI, TAU};
use crate::foundation::math::Vec3;

/// A shape that can be emitted into one triangle batch
pub trait TriangleShape {
    /// Vertices the shape adds
    fn vertex_count(&self) -> usize;

    /// Triangle indices the shape adds
    fn index_count(&self) -> usize;

    /// Reject parameters that cannot produce geometry
    fn validate(&self) -> BatchResult<()> {
        Ok(())
    }

    /// Add the shape's vertices and triangles; normals are left to the caller
    fn emit(&self, batch: &mut TriangleBatch) -> BatchResult<()>;
}

/// Memoised vertex indices of a grid's corners
struct IndexGrid {
    columns: usize,
    cells: Vec<Option<u16>>,
}

impl IndexGrid {
    fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            cells: vec![None; columns * rows],
        }
    }

    fn get_or_insert_with(
        &mut self,
        column: usize,
        row: usize,
        insert: impl FnOnce() -> BatchResult<u16>,
    ) -> BatchResult<u16> {
        let cell = &mut self.cells[row * self.columns + column];
        match *cell {
            Some(index) => Ok(index),
            None => {
                let index = insert()?;
                *cell = Some(index);
                Ok(index)
            }
        }
    }
}

/// Wire a `columns` x `rows` cell grid into `batch`
///
/// `key` maps a corner to the corner whose vertex it shares (identity for
/// flat grids; seams and poles for the sphere). Triangles that collapse onto
/// a repeated vertex are skipped.
fn emit_grid(
    batch: &mut TriangleBatch,
    columns: usize,
    rows: usize,
    color: Color,
    reverse: bool,
    key: impl Fn(usize, usize) -> (usize, usize),
    position: impl Fn(usize, usize) -> Vec3,
) -> BatchResult<()> {
    let mut table = IndexGrid::new(columns + 1, rows + 1);
    let mut corner = |batch: &mut TriangleBatch, column: usize, row: usize| -> BatchResult<u16> {
        let (column, row) = key(column, row);
        table.get_or_insert_with(column, row, || batch.add_point(position(column, row), color))
    };

    for row in 0..rows {
        for column in 0..columns {
            let a = corner(batch, column, row)?;
            let b = corner(batch, column + 1, row)?;
            let c = corner(batch, column + 1, row + 1)?;
            let d = corner(batch, column, row + 1)?;

            for [x, y, z] in [[a, b, c], [a, c, d]] {
                if x == y || y == z || x == z {
                    continue;
                }
                if reverse {
                    batch.add_triangle(x, z, y)?;
                } else {
                    batch.add_triangle(x, y, z)?;
                }
            }
        }
    }
    Ok(())
}

fn require_segments(shape: &str, segments: usize) -> BatchResult<()> {
    if segments == 0 {
        return Err(BatchError::InvalidGeometry(format!(
            "{shape} needs at least one segment per edge"
        )));
    }
    Ok(())
}

/// Parallelogram spanned by two edge vectors, split into a grid
///
/// The front face points along `u_axis × v_axis`; `reverse` flips it.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Center of the plane
    pub center: Vec3,
    /// Full edge along the first grid direction
    pub u_axis: Vec3,
    /// Full edge along the second grid direction
    pub v_axis: Vec3,
    /// Cells along `u_axis`
    pub u_segments: usize,
    /// Cells along `v_axis`
    pub v_segments: usize,
    /// Vertex color
    pub color: Color,
    /// Flip the winding
    pub reverse: bool,
}

impl Plane {
    /// Create a front-facing plane
    pub fn new(center: Vec3, u_axis: Vec3, v_axis: Vec3, segments: (usize, usize), color: Color) -> Self {
        Self {
            center,
            u_axis,
            v_axis,
            u_segments: segments.0,
            v_segments: segments.1,
            color,
            reverse: false,
        }
    }

    /// Same plane facing the other way
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

impl TriangleShape for Plane {
    fn vertex_count(&self) -> usize {
        self.u_segments.saturating_add(1).saturating_mul(self.v_segments.saturating_add(1))
    }

    fn index_count(&self) -> usize {
        self.u_segments.saturating_mul(self.v_segments).saturating_mul(6)
    }

    fn validate(&self) -> BatchResult<()> {
        require_segments("a plane", self.u_segments)?;
        require_segments("a plane", self.v_segments)
    }

    fn emit(&self, batch: &mut TriangleBatch) -> BatchResult<()> {
        let (us, vs) = (self.u_segments as f32, self.v_segments as f32);
        emit_grid(
            batch,
            self.u_segments,
            self.v_segments,
            self.color,
            self.reverse,
            |column, row| (column, row),
            |column, row| {
                self.center
                    + self.u_axis * (column as f32 / us - 0.5)
                    + self.v_axis * (row as f32 / vs - 0.5)
            },
        )
    }
}

/// Axis-aligned box with its own vertices per face
///
/// Faces do not share vertices, so edges stay sharp after normal generation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    /// Center of the box
    pub center: Vec3,
    /// Full extents along X, Y and Z
    pub size: Vec3,
    /// Cells along each face edge
    pub segments: usize,
    /// Vertex color
    pub color: Color,
    /// Flip the winding so the faces point inward
    pub reverse: bool,
}

impl BoxShape {
    /// Create an outward-facing box
    pub fn new(center: Vec3, size: Vec3, segments: usize, color: Color) -> Self {
        Self {
            center,
            size,
            segments,
            color,
            reverse: false,
        }
    }

    /// Same box facing inward
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }

    /// Outward normal and the two in-face axes of each face, with `u × v = normal`
    fn faces() -> [(Vec3, Vec3, Vec3); 6] {
        let (x, y, z) = (Vec3::x(), Vec3::y(), Vec3::z());
        [
            (x, y, z),
            (-x, z, y),
            (y, z, x),
            (-y, x, z),
            (z, x, y),
            (-z, y, x),
        ]
    }
}

impl TriangleShape for BoxShape {
    fn vertex_count(&self) -> usize {
        let side = self.segments.saturating_add(1);
        side.saturating_mul(side).saturating_mul(6)
    }

    fn index_count(&self) -> usize {
        self.segments.saturating_mul(self.segments).saturating_mul(36)
    }

    fn validate(&self) -> BatchResult<()> {
        require_segments("a box", self.segments)
    }

    fn emit(&self, batch: &mut TriangleBatch) -> BatchResult<()> {
        for (normal, u, v) in Self::faces() {
            let face = Plane {
                center: self.center + normal.component_mul(&self.size) * 0.5,
                u_axis: u.component_mul(&self.size),
                v_axis: v.component_mul(&self.size),
                u_segments: self.segments,
                v_segments: self.segments,
                color: self.color,
                reverse: self.reverse,
            };
            face.emit(batch)?;
        }
        Ok(())
    }
}

/// UV sphere with shared seam and pole vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius
    pub radius: f32,
    /// Segments around the Y axis
    pub slices: usize,
    /// Segments from pole to pole
    pub stacks: usize,
    /// Vertex color
    pub color: Color,
    /// Flip the winding so the surface faces inward
    pub reverse: bool,
}

impl Sphere {
    /// Create an outward-facing sphere
    pub fn new(center: Vec3, radius: f32, slices: usize, stacks: usize, color: Color) -> Self {
        Self {
            center,
            radius,
            slices,
            stacks,
            color,
            reverse: false,
        }
    }

    /// Same sphere facing inward
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

impl TriangleShape for Sphere {
    fn vertex_count(&self) -> usize {
        self.slices
            .saturating_mul(self.stacks.saturating_sub(1))
            .saturating_add(2)
    }

    fn index_count(&self) -> usize {
        self.slices
            .saturating_mul(self.stacks.saturating_sub(1))
            .saturating_mul(6)
    }

    fn validate(&self) -> BatchResult<()> {
        if self.slices < 3 || self.stacks < 2 {
            return Err(BatchError::InvalidGeometry(format!(
                "a sphere needs at least 3 slices and 2 stacks, got {} x {}",
                self.slices, self.stacks
            )));
        }
        if !self.radius.is_finite() {
            return Err(BatchError::InvalidGeometry(format!(
                "sphere radius must be finite, got {}",
                self.radius
            )));
        }
        Ok(())
    }

    fn emit(&self, batch: &mut TriangleBatch) -> BatchResult<()> {
        let (slices, stacks) = (self.slices, self.stacks);
        emit_grid(
            batch,
            slices,
            stacks,
            self.color,
            self.reverse,
            |column, row| {
                if row == 0 || row == stacks {
                    (0, row)
                } else {
                    (column % slices, row)
                }
            },
            |column, row| {
                let theta = PI * row as f32 / stacks as f32;
                let phi = TAU * column as f32 / slices as f32;
                let (sin_theta, cos_theta) = theta.sin_cos();
                let (sin_phi, cos_phi) = phi.sin_cos();
                self.center
                    + Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi) * self.radius
            },
        )
    }
}
