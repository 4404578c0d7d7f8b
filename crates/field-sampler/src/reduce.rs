//! Regular sub-grid reduction of row-major vector fields.

use projection::lonlat_to_mercator;
use viewer_common::BoundingBox;

use crate::field::{ProjectedPoint, VectorField};

/// Whether flattened index `index` survives reduction at `spacing`.
///
/// A point is kept when both its column stride test (`index % spacing`) and
/// its row (`index / row_length`) land on the sub-grid. A `row_length` of
/// zero treats the whole field as a single row; a `spacing` of zero is
/// treated as 1.
#[inline]
pub fn is_retained(index: usize, row_length: usize, spacing: u32) -> bool {
    let spacing = spacing.max(1) as usize;
    let row = if row_length == 0 { 0 } else { index / row_length };
    index % spacing == 0 && row % spacing == 0
}

/// Reduce a dense field to every `spacing`-th row and column.
///
/// Output keeps the original row-major order and reprojects each kept point
/// to Web Mercator. Attributes are shared with the source field unchanged.
pub fn reduce(field: &VectorField, spacing: u32) -> Vec<ProjectedPoint> {
    field
        .points
        .iter()
        .enumerate()
        .filter(|(index, _)| is_retained(*index, field.row_length, spacing))
        .map(|(index, record)| {
            let (x, y) = lonlat_to_mercator(record.lon, record.lat);
            ProjectedPoint {
                index,
                x,
                y,
                record: record.clone(),
            }
        })
        .collect()
}

/// Points falling inside a Web Mercator extent, in input order.
pub fn within_extent<'a>(
    points: &'a [ProjectedPoint],
    extent: &'a BoundingBox,
) -> impl Iterator<Item = &'a ProjectedPoint> + 'a {
    points
        .iter()
        .filter(move |point| extent.contains_point(point.x, point.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::VectorPoint;

    /// `rows` x `row_length` field where point i sits at (i, 0) degrees.
    fn grid(rows: usize, row_length: usize) -> VectorField {
        let points = (0..rows * row_length)
            .map(|i| VectorPoint::new(i as f64 * 0.01, 0.0, (i % 360) as f64, i as f64))
            .collect();
        VectorField::new(points, row_length, 3000.0)
    }

    fn indices(points: &[ProjectedPoint]) -> Vec<usize> {
        points.iter().map(|p| p.index).collect()
    }

    #[test]
    fn test_spacing_one_keeps_everything() {
        let field = grid(4, 5);
        let reduced = reduce(&field, 1);
        assert_eq!(indices(&reduced), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_keeps_sub_grid_not_every_nth_element() {
        // 6x6 grid at spacing 2: rows 0, 2, 4 and columns 0, 2, 4
        let field = grid(6, 6);
        let reduced = reduce(&field, 2);
        assert_eq!(
            indices(&reduced),
            vec![0, 2, 4, 12, 14, 16, 24, 26, 28]
        );
    }

    #[test]
    fn test_odd_row_length() {
        let field = grid(5, 5);
        let reduced = reduce(&field, 2);
        assert_eq!(indices(&reduced), vec![0, 2, 4, 10, 12, 14, 20, 22, 24]);
    }

    #[test]
    fn test_matches_retention_rule_exhaustively() {
        let field = grid(7, 9);
        for spacing in 1..=10u32 {
            let expected: Vec<usize> = (0..field.len())
                .filter(|i| i % spacing as usize == 0 && (i / 9) % spacing as usize == 0)
                .collect();
            assert_eq!(indices(&reduce(&field, spacing)), expected, "spacing {}", spacing);
        }
    }

    #[test]
    fn test_reduce_is_deterministic() {
        let field = grid(8, 8);
        assert_eq!(reduce(&field, 3), reduce(&field, 3));
    }

    #[test]
    fn test_attributes_carried_unmodified() {
        let points = vec![
            VectorPoint::new(-105.0, 40.0, 270.0, 12.0).with_attribute("gust", 18.5),
            VectorPoint::new(-104.9, 40.0, 90.0, 3.0),
        ];
        let field = VectorField::new(points, 2, 2000.0);
        let reduced = reduce(&field, 1);

        assert_eq!(reduced[0].direction(), 270.0);
        assert_eq!(reduced[0].magnitude(), 12.0);
        assert_eq!(reduced[0].record.lon, -105.0);
        assert_eq!(
            reduced[0].record.attributes.get("gust"),
            Some(&serde_json::Value::from(18.5))
        );

        let (x, y) = lonlat_to_mercator(-105.0, 40.0);
        assert_eq!((reduced[0].x, reduced[0].y), (x, y));
    }

    #[test]
    fn test_zero_spacing_and_row_length() {
        let field = grid(1, 6);
        assert_eq!(reduce(&field, 0).len(), 6);

        let flat = VectorField::new(
            (0..6).map(|i| VectorPoint::new(i as f64, 0.0, 0.0, 0.0)).collect(),
            0,
            1000.0,
        );
        assert_eq!(indices(&reduce(&flat, 2)), vec![0, 2, 4]);
    }

    #[test]
    fn test_within_extent() {
        let field = grid(1, 10);
        let reduced = reduce(&field, 1);
        let (max_x, _) = lonlat_to_mercator(0.045, 0.0);
        let extent = BoundingBox::new(-1.0, -1.0, max_x, 1.0);
        let visible: Vec<usize> = within_extent(&reduced, &extent).map(|p| p.index).collect();
        assert_eq!(visible, vec![0, 1, 2, 3, 4]);
    }
}
