//! Line-segment generators

use crate::batch::{BatchError, BatchResult};
use crate::foundation::color::Color;
use crate::foundation::math::constants::TAU;
use crate::foundation::math::utils::unit_circle_point;
use crate::foundation::math::{Quat, Vec3};
use crate::render::LineVertex;

/// Anything that accepts line segments
///
/// Implementors provide [`add_line`](LineSink::add_line); the shape helpers
/// come for free. Circles are drawn in the XY plane unless a rotation is
/// given. A helper either writes its whole shape or nothing.
pub trait LineSink {
    /// Append one segment
    fn add_line(&mut self, start: LineVertex, end: LineVertex) -> BatchResult<()>;

    /// Segments that can still be added, `None` when there is no limit
    fn lines_available(&self) -> Option<usize> {
        None
    }

    /// Closed circle of `sides` segments
    fn add_circle(&mut self, center: Vec3, radius: f32, sides: usize, color: Color) -> BatchResult<()> {
        self.add_circle_gradient(center, radius, sides, color, color)
    }

    /// Circle whose color sweeps from `start` to `end` over one turn
    fn add_circle_gradient(
        &mut self,
        center: Vec3,
        radius: f32,
        sides: usize,
        start: Color,
        end: Color,
    ) -> BatchResult<()> {
        add_ring(
            self,
            sides,
            |angle| center + unit_circle_point(angle) * radius,
            |t| start.lerp(end, t),
        )
    }

    /// Circle rotated out of the XY plane around its center
    fn add_circle_transformed(
        &mut self,
        center: Vec3,
        radius: f32,
        sides: usize,
        rotation: &Quat,
        color: Color,
    ) -> BatchResult<()> {
        add_ring(
            self,
            sides,
            |angle| center + rotation * (unit_circle_point(angle) * radius),
            |_| color,
        )
    }

    /// The twelve edges of an axis-aligned box
    fn add_box_outline(&mut self, min: Vec3, max: Vec3, color: Color) -> BatchResult<()> {
        let corner = |bits: usize| {
            Vec3::new(
                if bits & 1 == 0 { min.x } else { max.x },
                if bits & 2 == 0 { min.y } else { max.y },
                if bits & 4 == 0 { min.z } else { max.z },
            )
        };
        ensure_room(&*self, 12)?;
        // Corners differing in exactly one coordinate
        for a in 0..8usize {
            for axis in [1, 2, 4] {
                if a & axis == 0 {
                    self.add_line(
                        LineVertex::new(corner(a), color),
                        LineVertex::new(corner(a | axis), color),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Square grid in the XZ plane, `extent` wide with `divisions` cells per side
    fn add_grid(&mut self, center: Vec3, extent: f32, divisions: usize, color: Color) -> BatchResult<()> {
        if divisions == 0 {
            return Err(BatchError::InvalidGeometry(
                "a grid needs at least one division".to_string(),
            ));
        }
        ensure_room(&*self, 2 * (divisions + 1))?;
        let half = extent * 0.5;
        let step = extent / divisions as f32;
        for i in 0..=divisions {
            let offset = -half + step * i as f32;
            self.add_line(
                LineVertex::new(center + Vec3::new(offset, 0.0, -half), color),
                LineVertex::new(center + Vec3::new(offset, 0.0, half), color),
            )?;
            self.add_line(
                LineVertex::new(center + Vec3::new(-half, 0.0, offset), color),
                LineVertex::new(center + Vec3::new(half, 0.0, offset), color),
            )?;
        }
        Ok(())
    }
}

fn ensure_room<S: LineSink + ?Sized>(sink: &S, needed: usize) -> BatchResult<()> {
    match sink.lines_available() {
        Some(available) if available < needed => Err(BatchError::ShapeTooLarge { needed, available }),
        _ => Ok(()),
    }
}

/// Connect `sides` points sampled at equal angle steps into a closed loop
///
/// `color` receives the fraction of the turn at each point, so the closing
/// segment ends on the color for a full turn.
fn add_ring<S: LineSink + ?Sized>(
    sink: &mut S,
    sides: usize,
    point: impl Fn(f32) -> Vec3,
    color: impl Fn(f32) -> Color,
) -> BatchResult<()> {
    if sides < 3 {
        return Err(BatchError::InvalidGeometry(format!(
            "a circle needs at least 3 sides, got {sides}"
        )));
    }

    ensure_room(&*sink, sides)?;

    let step = TAU / sides as f32;
    let points: Vec<Vec3> = (0..sides).map(|i| point(step * i as f32)).collect();
    for i in 0..sides {
        let t_start = i as f32 / sides as f32;
        let t_end = (i + 1) as f32 / sides as f32;
        sink.add_line(
            LineVertex::new(points[i], color(t_start)),
            LineVertex::new(points[(i + 1) % sides], color(t_end)),
        )?;
    }
    Ok(())
}
