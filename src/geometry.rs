// src/geometry.rs
use geo::{BoundingRect, Centroid, Contains, Geometry, Intersects, MultiPolygon, Point, Polygon};
use rayon::prelude::*;

use crate::error::{FloodError, Result};
use crate::io::GeoInfo;

/// Study area boundary: the union of the polygons of a vector asset
#[derive(Debug, Clone)]
pub struct StudyArea {
    id: String,
    shape: MultiPolygon<f64>,
}

impl StudyArea {
    pub fn new(id: &str, shape: MultiPolygon<f64>) -> Result<Self> {
        if shape.0.is_empty() {
            return Err(FloodError::InvalidGeometry(format!(
                "study area {} has no polygons",
                id
            )));
        }
        Ok(Self {
            id: id.to_string(),
            shape,
        })
    }

    /// Collect the polygonal parts of a feature collection's geometries.
    /// Points and lines are ignored.
    pub fn from_geometries(id: &str, geometries: Vec<Geometry<f64>>) -> Result<Self> {
        let mut polygons = Vec::new();
        for geometry in geometries {
            collect_polygons(geometry, &mut polygons);
        }
        Self::new(id, MultiPolygon(polygons))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn centroid(&self) -> Result<Point<f64>> {
        self.shape
            .centroid()
            .ok_or_else(|| FloodError::InvalidGeometry(format!("study area {} has no centroid", self.id)))
    }

    pub fn intersects(&self, footprint: &Polygon<f64>) -> bool {
        self.shape.intersects(footprint)
    }

    /// Per-pixel inclusion mask on `grid`, tested at pixel centres
    pub fn pixel_mask(&self, grid: &GeoInfo) -> Vec<bool> {
        let (width, height) = (grid.width, grid.height);
        let bounds = self.shape.bounding_rect();

        (0..height)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..width).map(move |col| {
                    let (x, y) = grid.pixel_center(col, row);
                    let inside_bounds = bounds.is_some_and(|b| {
                        x >= b.min().x && x <= b.max().x && y >= b.min().y && y <= b.max().y
                    });
                    inside_bounds && self.shape.contains(&Point::new(x, y))
                })
            })
            .collect()
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon, Rect};

    fn square() -> StudyArea {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        StudyArea::from_geometries("square", vec![Geometry::Polygon(poly)]).unwrap()
    }

    #[test]
    fn pixel_mask_uses_pixel_centres() {
        // 4x4 grid of unit pixels covering (0,0)..(4,4)
        let grid = GeoInfo {
            projection: String::new(),
            geo_transform: [0.0, 1.0, 0.0, 4.0, 0.0, -1.0],
            width: 4,
            height: 4,
        };
        let mask = square().pixel_mask(&grid);
        let inside: Vec<usize> = mask.iter().enumerate().filter(|(_, &m)| m).map(|(i, _)| i).collect();
        // bottom-left 2x2 block: rows 2..4, cols 0..2
        assert_eq!(inside, vec![8, 9, 12, 13]);
    }

    #[test]
    fn centroid_of_square() {
        let area = square();
        let c = area.centroid().unwrap();
        assert!((c.x() - 1.0).abs() < 1e-12 && (c.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_polygonal_input() {
        let result = StudyArea::from_geometries("pt", vec![Geometry::Point(Point::new(1.0, 1.0))]);
        assert!(matches!(result, Err(FloodError::InvalidGeometry(_))));
    }

    #[test]
    fn footprint_intersection() {
        let area = square();
        let near = Rect::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 3.0, y: 3.0 }).to_polygon();
        let far = Rect::new(coord! { x: 5.0, y: 5.0 }, coord! { x: 6.0, y: 6.0 }).to_polygon();
        assert!(area.intersects(&near));
        assert!(!area.intersects(&far));
    }
}
