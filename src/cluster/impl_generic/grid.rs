//! Uniform grid index for fixed-radius neighbor queries.
//!
//! Points are bucketed into cubic cells of side `cell_size`. A query of
//! radius `<= cell_size` only has to look at the 3^d cells around the query
//! point. When 3^d exceeds the number of points the index degrades to a
//! linear scan, which is cheaper at that size. It also degrades when a cell
//! coordinate would not fit in an `i64` (a tiny `cell_size` against large
//! values).

use std::collections::BTreeMap;

use crate::dataset::Rows;
use crate::vector_math::squared_distance;

/// Largest cell coordinate magnitude; leaves headroom below `i64::MAX` for
/// the neighbor offsets.
const MAX_CELL_COORD: f64 = 4.0e18;

/// Grid of point indices keyed by integer cell coordinates.
///
/// Cells are kept in a `BTreeMap` so [`GridIndex::cells`] yields them in a
/// stable order.
#[derive(Debug)]
pub struct GridIndex<'a> {
    data: Rows<'a>,
    cell_size: f64,
    cells: BTreeMap<Vec<i64>, Vec<usize>>,
    offsets: Vec<Vec<i64>>,
}

impl<'a> GridIndex<'a> {
    /// Bucket every point of `data` into cells of side `cell_size` (> 0).
    pub fn build(data: Rows<'a>, cell_size: f64) -> Self {
        let d = data.dim();
        let mut cells: BTreeMap<Vec<i64>, Vec<usize>> = BTreeMap::new();
        let mut key = Vec::with_capacity(d);
        let mut bucketed = true;
        for (i, p) in data.iter().enumerate() {
            if !cell_key(p, cell_size, &mut key) {
                bucketed = false;
                cells.clear();
                break;
            }
            if let Some(bucket) = cells.get_mut(key.as_slice()) {
                bucket.push(i);
                continue;
            }
            cells.insert(key.clone(), vec![i]);
        }

        let neighbor_cells = u32::try_from(d)
            .ok()
            .and_then(|d| 3usize.checked_pow(d));
        let offsets = match neighbor_cells {
            Some(count) if bucketed && count <= data.len() => neighbor_offsets(d),
            _ => Vec::new(),
        };

        Self {
            data,
            cell_size,
            cells,
            offsets,
        }
    }

    /// Whether queries scan every point instead of probing cells.
    pub fn is_linear(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Occupied cells as point-index buckets, in key order. Empty when the
    /// coordinates could not be bucketed.
    pub fn cells(&self) -> impl Iterator<Item = &[usize]> {
        self.cells.values().map(Vec::as_slice)
    }

    /// Indices of all points within `radius` (inclusive) of `center`, in
    /// ascending order, written into `out`.
    pub fn radius_query(&self, center: &[f64], radius: f64, out: &mut Vec<usize>) {
        debug_assert!(radius <= self.cell_size);
        out.clear();
        let r2 = radius * radius;

        let mut base = Vec::with_capacity(center.len());
        if self.is_linear() || !cell_key(center, self.cell_size, &mut base) {
            out.extend(
                self.data
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| squared_distance(p, center) <= r2)
                    .map(|(i, _)| i),
            );
            return;
        }

        let mut key = vec![0i64; base.len()];
        'cells: for offset in &self.offsets {
            for ((k, &b), &o) in key.iter_mut().zip(&base).zip(offset) {
                match b.checked_add(o) {
                    Some(c) => *k = c,
                    None => continue 'cells,
                }
            }
            if let Some(bucket) = self.cells.get(key.as_slice()) {
                out.extend(
                    bucket
                        .iter()
                        .copied()
                        .filter(|&i| squared_distance(self.data.point(i), center) <= r2),
                );
            }
        }
        // Keep summation order independent of cell visit order
        out.sort_unstable();
    }
}

/// Integer cell coordinates of `p`. Returns false when a coordinate is not
/// finite or exceeds [`MAX_CELL_COORD`].
fn cell_key(p: &[f64], cell_size: f64, key: &mut Vec<i64>) -> bool {
    key.clear();
    for &v in p {
        let c = (v / cell_size).floor();
        if c.is_nan() || c.abs() > MAX_CELL_COORD {
            return false;
        }
        key.push(c as i64);
    }
    true
}

/// All vectors in {-1, 0, 1}^d.
fn neighbor_offsets(d: usize) -> Vec<Vec<i64>> {
    let mut offsets = vec![Vec::with_capacity(d)];
    for _ in 0..d {
        offsets = offsets
            .into_iter()
            .flat_map(|prefix| {
                [-1i64, 0, 1].into_iter().map(move |o| {
                    let mut next = prefix.clone();
                    next.push(o);
                    next
                })
            })
            .collect();
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn test_neighbor_offsets() {
        assert_eq!(neighbor_offsets(1), vec![vec![-1], vec![0], vec![1]]);
        assert_eq!(neighbor_offsets(3).len(), 27);
    }

    #[test]
    fn test_radius_query_matches_linear_scan() {
        let mut rows = Vec::new();
        for r in (0..=250).step_by(25) {
            for g in (0..=250).step_by(50) {
                rows.push([r as f64, g as f64, ((r + g) % 256) as f64]);
            }
        }
        let data = Dataset::from_rows(&rows).unwrap();
        let grid = GridIndex::build(data.rows(), 40.0);
        assert!(!grid.is_linear());

        let mut found = Vec::new();
        for center in [[0.0, 0.0, 0.0], [120.0, 60.0, 180.0], [250.0, 250.0, 244.0]] {
            grid.radius_query(&center, 40.0, &mut found);
            let expected: Vec<usize> = (0..data.len())
                .filter(|&i| squared_distance(data.point(i), &center) <= 1600.0)
                .collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_small_dataset_uses_linear_scan() {
        let data = Dataset::from_rows(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]).unwrap();
        let grid = GridIndex::build(data.rows(), 10.0);
        assert!(grid.is_linear());
        let mut found = Vec::new();
        grid.radius_query(&[0.0, 0.0, 0.0], 1.0, &mut found);
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn test_negative_coordinates_bucket_below_zero() {
        let data = Dataset::from_rows(&[[-0.5], [0.5], [1.5], [2.5]]).unwrap();
        let grid = GridIndex::build(data.rows(), 1.0);
        assert_eq!(grid.cells().count(), 4);
        let mut found = Vec::new();
        grid.radius_query(&[0.0], 0.5, &mut found);
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_tiny_cell_size_falls_back_to_linear_scan() {
        // 200 / 1e-17 does not fit in an i64 cell coordinate
        let rows: Vec<[f64; 3]> = (0..30).map(|i| [200.0 + (i % 3) as f64; 3]).collect();
        let data = Dataset::from_rows(&rows).unwrap();
        let grid = GridIndex::build(data.rows(), 1e-17);
        assert!(grid.is_linear());
        assert_eq!(grid.cells().count(), 0);

        let mut found = Vec::new();
        grid.radius_query(&[201.0, 201.0, 201.0], 1e-17, &mut found);
        let expected: Vec<usize> = (0..30).filter(|i| i % 3 == 1).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_cell_key_rejects_out_of_range() {
        let mut key = Vec::new();
        assert!(cell_key(&[-2.5, 3.0], 1.0, &mut key));
        assert_eq!(key, vec![-3, 3]);
        assert!(!cell_key(&[200.0], 1e-17, &mut key));
        assert!(!cell_key(&[f64::NAN], 1.0, &mut key));
        assert!(!cell_key(&[f64::INFINITY], 1.0, &mut key));
    }
}
