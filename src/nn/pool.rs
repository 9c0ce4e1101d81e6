use serde::{Deserialize, Serialize};

use crate::math::tensor::{Shape, Tensor};

/// 2×2 max pooling with stride 2 (trailing rows/columns that do not fill a
/// window are dropped, matching the usual floor-division output size).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxPool2d {
    pub pool: usize,
    #[serde(skip)]
    in_shape: Shape,
    /// Flat input index of the winning element for each output element.
    #[serde(skip)]
    argmax: Vec<usize>,
}

impl MaxPool2d {
    pub fn new(pool: usize) -> MaxPool2d {
        MaxPool2d {
            pool,
            in_shape: Shape::new(0, 0, 0),
            argmax: vec![],
        }
    }

    pub fn out_shape(&self, input: Shape) -> Shape {
        Shape::new(input.h / self.pool, input.w / self.pool, input.c)
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        let out_shape = self.out_shape(x.shape);
        let mut out = Tensor::zeros(out_shape);
        let mut argmax = vec![0usize; out_shape.len()];

        for oy in 0..out_shape.h {
            for ox in 0..out_shape.w {
                for c in 0..out_shape.c {
                    let mut best = f64::NEG_INFINITY;
                    let mut best_idx = 0usize;
                    for dy in 0..self.pool {
                        for dx in 0..self.pool {
                            let iy = oy * self.pool + dy;
                            let ix = ox * self.pool + dx;
                            let idx = x.idx(iy, ix, c);
                            if x.data[idx] > best {
                                best = x.data[idx];
                                best_idx = idx;
                            }
                        }
                    }
                    let oi = out.idx(oy, ox, c);
                    out.data[oi] = best;
                    argmax[oi] = best_idx;
                }
            }
        }

        if training {
            self.in_shape = x.shape;
            self.argmax = argmax;
        }
        out
    }

    /// Routes each output gradient back to the input position that won the max.
    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        let mut dx = Tensor::zeros(self.in_shape);
        for (oi, &ii) in self.argmax.iter().enumerate() {
            dx.data[ii] += grad_out.data[oi];
        }
        dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_window_maximum() {
        let mut pool = MaxPool2d::new(2);
        let x = Tensor::from_vec(
            Shape::new(2, 4, 1),
            vec![1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0],
        );
        let y = pool.forward(&x, true);
        assert_eq!(y.shape, Shape::new(1, 2, 1));
        assert_eq!(y.data, vec![4.0, 8.0]);
    }

    #[test]
    fn odd_trailing_edge_is_dropped() {
        let mut pool = MaxPool2d::new(2);
        let x = Tensor::zeros(Shape::new(5, 5, 3));
        let y = pool.forward(&x, false);
        assert_eq!(y.shape, Shape::new(2, 2, 3));
    }

    #[test]
    fn gradient_routes_to_argmax() {
        let mut pool = MaxPool2d::new(2);
        let x = Tensor::from_vec(
            Shape::new(2, 2, 1),
            vec![1.0, 9.0, 3.0, 4.0],
        );
        pool.forward(&x, true);
        let g = Tensor::from_vec(Shape::new(1, 1, 1), vec![2.5]);
        let dx = pool.backward(&g);
        assert_eq!(dx.data, vec![0.0, 2.5, 0.0, 0.0]);
    }
}
