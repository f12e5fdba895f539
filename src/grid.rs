/// A bounded 2D raster grid (no wrapping at any edge).
#[derive(Clone, Debug)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a grid from row-major data.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// 4-connected neighbors inside the grid.
    pub fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .map(move |(dx, dy)| (x as i64 + dx, y as i64 + dy))
            .filter(|&(nx, ny)| self.in_bounds(nx, ny))
            .map(|(nx, ny)| (nx as usize, ny as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_has_two_neighbors() {
        let grid = Grid::new_with(4, 3, 0u8);
        let corner: Vec<_> = grid.neighbors(0, 0).collect();
        assert_eq!(corner, vec![(1, 0), (0, 1)]);
        assert_eq!(grid.neighbors(1, 1).count(), 4);
        assert_eq!(grid.neighbors(3, 2).count(), 2);
    }

    #[test]
    fn test_from_vec_checks_size() {
        assert!(Grid::from_vec(2, 2, vec![1, 2, 3]).is_none());
        let grid = Grid::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(*grid.get(1, 1), 4);
    }
}
