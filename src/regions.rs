//! Connected regions of a binary field with their outer boundaries.

use ndarray as nd;

use crate::field::ScalarField;

/// Moore neighbourhood, clockwise on screen starting west
const DIRECTIONS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// An 8-connected set of pixels above the level
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub area: usize,
    /// inclusive bounds
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
    /// Outer boundary pixels `(x, y)` in clockwise order, starting at the
    /// top-most, left-most pixel
    pub boundary: Vec<(usize, usize)>,
}

impl Region {
    pub fn width(&self) -> usize {
        self.x_max + 1 - self.x_min
    }

    pub fn height(&self) -> usize {
        self.y_max + 1 - self.y_min
    }
}

/// Label the 8-connected regions where `mask > level`. Regions come out in
/// raster order of their first pixel.
pub fn find_regions(mask: &ScalarField, level: f32) -> Vec<Region> {
    let (h, w) = mask.dim();
    let mut labels = nd::Array2::<u32>::zeros((h, w));
    let mut regions = vec![];
    let mut stack = vec![];

    for y in 0..h {
        for x in 0..w {
            if labels[(y, x)] != 0 || mask[(y, x)] <= level {
                continue;
            }
            let label = regions.len() as u32 + 1;
            let mut region = Region {
                area: 0,
                x_min: x,
                y_min: y,
                x_max: x,
                y_max: y,
                boundary: vec![],
            };
            labels[(y, x)] = label;
            stack.push((x, y));
            while let Some((px, py)) = stack.pop() {
                region.area += 1;
                region.x_min = region.x_min.min(px);
                region.x_max = region.x_max.max(px);
                region.y_min = region.y_min.min(py);
                region.y_max = region.y_max.max(py);
                for (dx, dy) in DIRECTIONS {
                    let (Some(nx), Some(ny)) = (px.checked_add_signed(dx), py.checked_add_signed(dy)) else {
                        continue;
                    };
                    if nx < w && ny < h && labels[(ny, nx)] == 0 && mask[(ny, nx)] > level {
                        labels[(ny, nx)] = label;
                        stack.push((nx, ny));
                    }
                }
            }
            region.boundary = trace_boundary(&labels, label, (x, y), region.area);
            regions.push(region);
        }
    }
    regions
}

/// Moore neighbour tracing with Jacob's stopping criterion. `start` must be
/// the first pixel of the region in raster order, so its west neighbour is
/// outside the region.
fn trace_boundary(labels: &nd::Array2<u32>, label: u32, start: (usize, usize), area: usize) -> Vec<(usize, usize)> {
    let (h, w) = labels.dim();
    let inside = |x: isize, y: isize| {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && labels[(y as usize, x as usize)] == label
    };

    let start_i = (start.0 as isize, start.1 as isize);
    let mut current = start_i;
    let mut backtrack = 0;
    let mut first_move = None;
    let mut contour = vec![start];
    let limit = 4 * area + 8;

    loop {
        let found = (1..=8)
            .map(|i| (backtrack + i) % 8)
            .find(|&d| inside(current.0 + DIRECTIONS[d].0, current.1 + DIRECTIONS[d].1));
        // isolated pixel
        let Some(d) = found else { break };

        if current == start_i {
            match first_move {
                None => first_move = Some(d),
                Some(d0) if d0 == d => break,
                _ => {}
            }
        }

        let next = (current.0 + DIRECTIONS[d].0, current.1 + DIRECTIONS[d].1);
        // the last background pixel checked around `current` neighbours `next`
        let before = DIRECTIONS[(d + 7) % 8];
        let offset = (current.0 + before.0 - next.0, current.1 + before.1 - next.1);
        backtrack = DIRECTIONS.iter().position(|&o| o == offset).unwrap_or(0);

        current = next;
        contour.push((current.0 as usize, current.1 as usize));
        if contour.len() > limit {
            break;
        }
    }

    if contour.len() > 1 && contour.last() == contour.first() {
        contour.pop();
    }
    contour
}
